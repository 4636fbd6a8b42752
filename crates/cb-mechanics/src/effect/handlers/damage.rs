//! Damage payloads and the riders that redistribute them.
//!
//! These handlers only fill slots. Mitigation and application happen once,
//! in the combat engine, after every hook has run.

use cb_core::CombatantId;

use super::canonical_damage_type;
use crate::dice::DiceExpr;
use crate::effect::catalog::HandlerArgs;
use crate::effect::registry::{Handler, handler};
use crate::error::MechResult;

/// How far a chain can jump from the primary target, in cells.
pub const CHAIN_RANGE: u32 = 3;

/// Add HP damage to the pending payload.
///
/// Captures: optional `dice` or `dice2`, optional `kind`. With no dice the
/// tier table decides. The `type` argument supplies a default kind.
pub fn damage(args: &HandlerArgs) -> MechResult<Handler> {
    let default_kind = args.get("type").map(canonical_damage_type);
    Ok(handler(move |m, ctx| {
        let expr = match m.named("dice").or_else(|| m.named("dice2")) {
            Some(raw) => DiceExpr::parse(raw)?,
            None => ctx.config.damage_for_tier(ctx.tier),
        };
        let amount = ctx.roll(&expr);
        let kind = m
            .named("kind")
            .map(canonical_damage_type)
            .or_else(|| default_kind.clone());
        tracing::debug!(rule = m.rule(), %expr, amount, kind = ?kind, "damage rolled");
        ctx.slots.add_damage(amount, kind.as_deref());
        Ok(())
    }))
}

/// Add composure damage to the pending payload.
///
/// Captures: `dice`.
pub fn composure_damage(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let expr = DiceExpr::parse(m.require("dice")?)?;
        let amount = ctx.roll(&expr);
        ctx.slots.add_composure(amount);
        Ok(())
    }))
}

/// Heal the attacker for a share of the damage dealt.
///
/// Captures: optional `pct` (the `pct` argument, else 50).
pub fn lifesteal(args: &HandlerArgs) -> MechResult<Handler> {
    let default_pct = args.parse::<u32>("pct")?.unwrap_or(50);
    Ok(handler(move |m, ctx| {
        let pct = m.int("pct")?.map_or(default_pct, |p| p.max(0) as u32);
        ctx.slots.lifesteal_pct = Some(ctx.slots.lifesteal_pct.unwrap_or(0).max(pct).min(100));
        Ok(())
    }))
}

/// Send a share of the damage back to the attacker.
///
/// Captures: optional `pct` (the `pct` argument, else 50).
pub fn reflect(args: &HandlerArgs) -> MechResult<Handler> {
    let default_pct = args.parse::<u32>("pct")?.unwrap_or(50);
    Ok(handler(move |m, ctx| {
        let pct = m.int("pct")?.map_or(default_pct, |p| p.max(0) as u32);
        ctx.slots.reflect_pct = Some(ctx.slots.reflect_pct.unwrap_or(0).max(pct).min(100));
        Ok(())
    }))
}

/// Spread the payload to everyone in a radius around the target.
///
/// Captures: `feet`. The actor is never caught in its own area.
pub fn area(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let feet = m.int("feet")?.unwrap_or(0).max(0) as u32;
        let radius = ctx.config.feet_to_cells(feet);
        let center = ctx.field.require(ctx.target_or_self())?.position;
        let caught: Vec<CombatantId> = ctx
            .field
            .living()
            .filter(|c| c.id != ctx.attacker && Some(c.id) != ctx.target)
            .filter(|c| c.position.distance(center) <= radius)
            .map(|c| c.id)
            .collect();
        for id in caught {
            if !ctx.slots.aoe_targets.contains(&id) {
                ctx.slots.aoe_targets.push(id);
            }
        }
        tracing::debug!(radius, targets = ctx.slots.aoe_targets.len(), "area effect");
        Ok(())
    }))
}

/// Pick up to N enemies near the target for one extra application.
///
/// Captures: `count`. Does nothing once the nesting ceiling is reached.
pub fn chain(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        if !ctx.can_nest() {
            return Ok(());
        }
        let count = m.int("count")?.unwrap_or(1).max(0) as usize;
        let primary = ctx.target_id()?;
        let origin = ctx.field.require(primary)?.position;
        let mut candidates: Vec<(u32, CombatantId)> = ctx
            .field
            .enemies_of(ctx.attacker)
            .into_iter()
            .filter(|c| c.id != primary && c.position.distance(origin) <= CHAIN_RANGE)
            .map(|c| (c.position.distance(origin), c.id))
            .collect();
        candidates.sort_by_key(|(distance, _)| *distance);
        ctx.slots.chain_targets = candidates
            .into_iter()
            .take(count)
            .map(|(_, id)| id)
            .collect();
        Ok(())
    }))
}
