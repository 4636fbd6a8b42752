//! Forced movement, teleports, and terrain hazards.

use cb_core::{Hazard, Position};

use crate::effect::catalog::HandlerArgs;
use crate::effect::context::ResolutionContext;
use crate::effect::registry::{Handler, handler};
use crate::error::{MechError, MechResult};

/// Which way forced movement goes relative to the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shove {
    Away,
    Toward,
}

/// Push the target straight away from the actor. Captures: `feet`.
pub fn push(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let feet = m.int("feet")?.unwrap_or(0).max(0) as u32;
        forced_move(ctx, feet, Shove::Away)
    }))
}

/// Pull the target straight toward the actor. Captures: `feet`.
pub fn pull(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let feet = m.int("feet")?.unwrap_or(0).max(0) as u32;
        forced_move(ctx, feet, Shove::Toward)
    }))
}

/// Slide the target one cell at a time until it runs out of distance or
/// hits something.
fn forced_move(ctx: &mut ResolutionContext<'_>, feet: u32, shove: Shove) -> MechResult<()> {
    let target = ctx.target_id()?;
    let from = ctx.field.require(ctx.attacker)?.position;
    let start = ctx.field.require(target)?.position;
    let (dx, dy) = match shove {
        Shove::Away => from.direction_to(start),
        Shove::Toward => start.direction_to(from),
    };
    if (dx, dy) == (0, 0) {
        return Ok(());
    }
    let mut at = start;
    for _ in 0..ctx.config.feet_to_cells(feet) {
        let next = at.offset(dx, dy);
        if !ctx.field.is_free(next) {
            break;
        }
        at = next;
    }
    if at == start {
        return Ok(());
    }
    ctx.field.place(target, at)?;
    let moved = start.distance(at) * ctx.config.feet_per_cell;
    let verb = match shove {
        Shove::Away => "pushed",
        Shove::Toward => "pulled",
    };
    let name = ctx.field.require(target)?.name.clone();
    ctx.narrate(format!("{name} is {verb} {moved} ft to {at}."));
    Ok(())
}

/// Teleport the actor next to the target. Captures: `feet` (range).
///
/// Picks the free cell beside the target closest to the actor; does
/// nothing when every such cell is out of range or taken.
pub fn teleport(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let feet = m.int("feet")?.unwrap_or(0).max(0) as u32;
        let range = ctx.config.feet_to_cells(feet);
        let target = ctx.target.ok_or(MechError::MissingTarget)?;
        let origin = ctx.field.require(ctx.attacker)?.position;
        let anchor = ctx.field.require(target)?.position;
        let landing: Option<Position> = anchor
            .neighbors()
            .into_iter()
            .filter(|cell| ctx.field.is_free(*cell) && origin.distance(*cell) <= range)
            .min_by_key(|cell| origin.distance(*cell));
        let Some(cell) = landing else {
            ctx.narrate("No room to teleport.");
            return Ok(());
        };
        ctx.field.place(ctx.attacker, cell)?;
        let name = ctx.field.require(ctx.attacker)?.name.clone();
        ctx.narrate(format!("{name} teleports to {cell}."));
        Ok(())
    }))
}

/// Leave a burning hazard under the target (or the actor when alone).
/// Reads the `damage` argument, default 2.
pub fn ignite(args: &HandlerArgs) -> MechResult<Handler> {
    let damage = args.parse::<i32>("damage")?.unwrap_or(2);
    Ok(handler(move |_, ctx| {
        let cell = ctx.field.require(ctx.target_or_self())?.position;
        ctx.field
            .terrain_mut()
            .set_hazard(cell, Some(Hazard::fire(damage)));
        ctx.narrate(format!("The ground at {cell} bursts into flame."));
        Ok(())
    }))
}
