//! Resource costs and healing.

use cb_core::Pool;

use super::Recipient;
use crate::dice::DiceExpr;
use crate::effect::catalog::HandlerArgs;
use crate::effect::registry::{Handler, handler};
use crate::error::MechResult;

/// Pay a resource cost or abort the whole resolution.
///
/// Captures: `amount`, `pool`. Deducts only when the actor can cover the
/// full amount; otherwise logs "Not enough <POOL>" and aborts.
pub fn cost(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let amount = m.int("amount")?.unwrap_or(0);
        let pool = Pool::parse(m.require("pool")?)?;
        let actor = ctx.actor_mut()?;
        if actor.spend(pool, amount) {
            let line = format!("{} spends {amount} {pool}.", actor.name);
            ctx.narrate(line);
        } else {
            tracing::debug!(combatant = %actor.name, %pool, amount, "cost not covered");
            ctx.slots.aborted = true;
            ctx.narrate(format!("Not enough {pool}"));
        }
        Ok(())
    }))
}

/// How far a revived combatant may be shifted when someone holds their cell.
const RISE_RADIUS: u32 = 3;

/// Restore a pool.
///
/// Captures: `verb`, `amount`, optional `pool` (HP when absent). "Regain"
/// and "recover" always land on the actor; other verbs land on the target
/// when there is one, unless the rule's `target` argument says `self`.
/// A fallen combatant whose cell was taken rises on the nearest free cell;
/// with none in reach the heal fizzles.
pub fn heal(args: &HandlerArgs) -> MechResult<Handler> {
    let recipient = Recipient::from_args(args);
    Ok(handler(move |m, ctx| {
        let expr = DiceExpr::parse(m.require("amount")?)?;
        let pool = match m.named("pool") {
            Some(raw) => Pool::parse(&raw.split_whitespace().collect::<Vec<_>>().join(" "))?,
            None => Pool::Hp,
        };
        let reflexive = m
            .named("verb")
            .is_some_and(|v| v.to_lowercase().starts_with("re") && !v.to_lowercase().starts_with("res"));
        let who = if reflexive || recipient == Recipient::Actor {
            ctx.attacker
        } else {
            ctx.target_or_self()
        };
        let amount = ctx.roll(&expr);
        let (down, origin, name) = {
            let patient = ctx.field.require(who)?;
            (!patient.is_alive(), patient.position, patient.name.clone())
        };
        if down && pool == Pool::Hp && amount > 0 && ctx.field.occupant(origin).is_some() {
            match ctx.field.nearest_free(origin, RISE_RADIUS) {
                Some(cell) => {
                    ctx.field.place(who, cell)?;
                    ctx.narrate(format!("{name} rises at {cell}."));
                }
                None => {
                    tracing::debug!(combatant = %name, %origin, "no free cell to revive into");
                    ctx.narrate(format!("There is no room for {name} to rise."));
                    return Ok(());
                }
            }
        }
        let patient = ctx.field.require_mut(who)?;
        let gained = patient.heal(pool, amount);
        let revived = down && patient.is_alive();
        ctx.narrate(format!("{name} recovers {gained} {pool}!"));
        if revived {
            ctx.narrate(format!("{name} is back on their feet!"));
        }
        Ok(())
    }))
}
