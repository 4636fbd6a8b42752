//! Conditions: applying, saving against, curing, and granting defenses.

use cb_core::{CombatantId, EffectDuration, Stat};

use super::{DurationReader, Recipient, canonical_damage_type, condition_spec};
use crate::effect::catalog::HandlerArgs;
use crate::effect::context::ResolutionContext;
use crate::effect::registry::{Handler, handler};
use crate::error::{MechError, MechResult};

/// Apply a named condition. Requires the `condition` argument; reads the
/// optional `flag` and `target` arguments and any "for N rounds" text.
pub fn status(args: &HandlerArgs) -> MechResult<Handler> {
    let condition = args.require("condition")?.to_string();
    let flag = args.get("flag").map(str::to_string);
    let recipient = Recipient::from_args(args);
    let durations = DurationReader::new()?;
    Ok(handler(move |m, ctx| {
        let who = match recipient {
            Recipient::Actor => ctx.attacker,
            Recipient::Target => ctx.target_id()?,
        };
        let duration = durations.read(m.text(), ctx.config.default_status_rounds);
        inflict(ctx, who, &condition, duration, flag.as_deref())
    }))
}

/// Saving throw: the target rolls d20 + stat modifier against a DC and
/// takes the condition on a failure.
///
/// Captures: `stat`, `condition`, optional `dc` (else the configured DC).
pub fn saving_throw(_args: &HandlerArgs) -> MechResult<Handler> {
    let durations = DurationReader::new()?;
    Ok(handler(move |m, ctx| {
        let stat = Stat::parse(m.require("stat")?)?;
        let word = m.require("condition")?;
        let spec = condition_spec(word).ok_or_else(|| MechError::MalformedCapture {
            rule: m.rule().to_string(),
            group: format!("condition '{word}'"),
        })?;
        let dc = m.int("dc")?.unwrap_or(ctx.config.default_save_dc);
        let who = ctx.target_id()?;
        let natural = ctx.dice.d20() as i32;
        let target = ctx.field.require(who)?;
        let total = natural + target.modifier(stat);
        let name = target.name.clone();
        if total >= dc {
            ctx.narrate(format!("{name} resists ({stat} {total} vs DC {dc})."));
            return Ok(());
        }
        ctx.narrate(format!("{name} fails the {stat} save ({total} vs DC {dc})."));
        let duration = durations.read(m.text(), ctx.config.default_status_rounds);
        inflict(ctx, who, spec.name, duration, spec.flag)
    }))
}

/// Remove a condition from the target (or the actor when alone).
///
/// Captures: `condition`.
pub fn cure(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let word = m.require("condition")?;
        let Some(spec) = condition_spec(word) else {
            return Ok(());
        };
        let who = ctx.target_or_self();
        let patient = ctx.field.require_mut(who)?;
        if patient.remove_condition(spec.name) {
            let line = format!("{} is no longer {}.", patient.name, spec.name);
            ctx.narrate(line);
        }
        Ok(())
    }))
}

/// Grant "Resistance to <type>" as a timed condition.
///
/// Captures: `kind`. Lands on the target, or the actor when alone.
pub fn grant_resistance(_args: &HandlerArgs) -> MechResult<Handler> {
    let durations = DurationReader::new()?;
    Ok(handler(move |m, ctx| {
        let kind = canonical_damage_type(m.require("kind")?);
        let who = ctx.target_or_self();
        let duration = durations.read(m.text(), ctx.config.default_status_rounds);
        inflict(ctx, who, &format!("Resistance to {kind}"), duration, None)
    }))
}

fn inflict(
    ctx: &mut ResolutionContext<'_>,
    who: CombatantId,
    condition: &str,
    duration: EffectDuration,
    flag: Option<&str>,
) -> MechResult<()> {
    let victim = ctx.field.require_mut(who)?;
    let Some(now) = victim.add_condition(condition, duration, flag) else {
        return Ok(());
    };
    let line = match now {
        EffectDuration::Rounds(n) => format!("{} {condition} for {n} round(s)!", victim.name),
        EffectDuration::Permanent => format!("{} {condition} permanently!", victim.name),
    };
    ctx.narrate(line);
    Ok(())
}
