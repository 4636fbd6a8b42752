//! Damage mitigation, the crit injury table, and applying a resolved
//! damage payload to the battlefield.
//!
//! Handlers only fill [`ResolutionSlots`]; nothing here runs until the
//! engine finalizes an attack or activation. Mitigation order is fixed:
//! immunity, then resistance and vulnerability, then flat reduction.

use cb_core::{Combatant, CombatantId, EffectDuration, Pool};

use crate::dice::{DiceRoller, Die};
use crate::effect::{ResolutionContext, ResolutionSlots};
use crate::error::MechResult;

/// Defenses that apply to one packet of damage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Defenses {
    /// Damage drops to zero.
    pub immune: bool,
    /// Damage is halved, rounding down.
    pub resist: bool,
    /// Damage is doubled.
    pub vulnerable: bool,
    /// Flat reduction after multipliers.
    pub reduction: i32,
}

impl Defenses {
    /// Defenses granted by the defender's own conditions.
    pub fn from_conditions(defender: &Combatant, damage_type: Option<&str>) -> Self {
        let Some(kind) = damage_type else {
            return Self::default();
        };
        let has = |prefix: &str| defender.has_condition(&format!("{prefix} {kind}"));
        Self {
            immune: has("Immune to"),
            resist: has("Resistance to"),
            vulnerable: has("Vulnerable to"),
            reduction: 0,
        }
    }

    /// Condition defenses plus whatever ON_DEFEND text recorded in the slots.
    pub fn gather(slots: &ResolutionSlots, defender: &Combatant, damage_type: Option<&str>) -> Self {
        let mut defenses = Self::from_conditions(defender, damage_type);
        if let Some(kind) = damage_type {
            let listed = |list: &[String]| list.iter().any(|k| k.eq_ignore_ascii_case(kind));
            defenses.immune |= listed(&slots.immunities);
            defenses.resist |= listed(&slots.resistances);
            defenses.vulnerable |= listed(&slots.vulnerabilities);
        }
        defenses.reduction = slots.damage_reduction.unwrap_or(0);
        defenses
    }
}

/// Apply defenses to a raw amount. Never negative.
pub fn mitigate(amount: i32, defenses: Defenses, ignore_armor: bool, ignore_resistance: bool) -> i32 {
    let mut amount = amount.max(0);
    if !ignore_resistance {
        if defenses.immune {
            return 0;
        }
        if defenses.resist {
            amount /= 2;
        }
    }
    if defenses.vulnerable {
        amount = amount.saturating_mul(2);
    }
    if !ignore_armor {
        amount = amount.saturating_sub(defenses.reduction.max(0));
    }
    amount.max(0)
}

/// One row of the crit injury table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injury {
    /// d6 face that selects the row.
    pub face: u32,
    /// Injury name used in the log.
    pub name: &'static str,
    /// Condition inflicted on the defender.
    pub condition: &'static str,
    /// Rounds the condition lasts.
    pub rounds: u32,
    /// Flag bound to the condition, if any.
    pub flag: Option<&'static str>,
}

/// Crit severity table, indexed by a d6.
pub const INJURY_TABLE: [Injury; 6] = [
    Injury { face: 1, name: "Winded", condition: "Slowed", rounds: 1, flag: None },
    Injury { face: 2, name: "Gashed", condition: "Bleeding", rounds: 2, flag: None },
    Injury { face: 3, name: "Staggered", condition: "Prone", rounds: 1, flag: None },
    Injury { face: 4, name: "Dazed", condition: "Frightened", rounds: 1, flag: None },
    Injury { face: 5, name: "Concussed", condition: "Stunned", rounds: 1, flag: Some("stunned") },
    Injury { face: 6, name: "Maimed", condition: "Restrained", rounds: 2, flag: None },
];

/// Roll a row of the injury table.
pub fn roll_injury(dice: &mut dyn DiceRoller) -> &'static Injury {
    let face = dice.roll(Die::D6).clamp(1, 6);
    &INJURY_TABLE[(face - 1) as usize]
}

/// Inflict an injury row on a combatant, narrating it.
pub(crate) fn inflict_injury(
    ctx: &mut ResolutionContext<'_>,
    target: CombatantId,
    injury: &Injury,
) -> MechResult<()> {
    let defender = ctx.field.require_mut(target)?;
    defender.add_condition(injury.condition, EffectDuration::Rounds(injury.rounds), injury.flag);
    let name = defender.name.clone();
    ctx.narrate(format!(
        "Critical injury: {name} is {} ({} for {} round(s))!",
        injury.name, injury.condition, injury.rounds
    ));
    Ok(())
}

/// Put `amount` HP damage on a combatant and narrate it. Returns HP lost.
pub(crate) fn apply_hp_damage(
    ctx: &mut ResolutionContext<'_>,
    target: CombatantId,
    amount: i32,
    damage_type: Option<&str>,
) -> MechResult<i32> {
    let defender = ctx.field.require_mut(target)?;
    let was_alive = defender.is_alive();
    let lost = defender.take_damage(amount);
    let fell = was_alive && !defender.is_alive();
    let name = defender.name.clone();
    match damage_type {
        Some(kind) => ctx.narrate(format!("{lost} {kind} damage to {name}!")),
        None => ctx.narrate(format!("{lost} damage to {name}!")),
    }
    if fell {
        ctx.narrate(format!("{name} falls!"));
    }
    Ok(lost)
}

/// HP lost by each recipient of a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageReport {
    /// HP lost by the primary target.
    pub primary: i32,
    /// HP lost by area and chain targets.
    pub splash: Vec<(CombatantId, i32)>,
    /// HP lost by the actor to reflected damage.
    pub reflected: i32,
    /// HP the actor regained through lifesteal.
    pub drained: i32,
}

impl DamageReport {
    /// Total HP lost by everyone except the actor.
    pub fn total(&self) -> i32 {
        self.primary + self.splash.iter().map(|(_, n)| n).sum::<i32>()
    }
}

/// Apply the pending damage and composure slots.
///
/// The primary target is mitigated by its conditions plus the slot
/// defenses; area and chain targets only by their own conditions.
/// Chain targets take half damage. Lifesteal and reflect key off the
/// primary target's loss.
pub(crate) fn deliver(ctx: &mut ResolutionContext<'_>, primary: Option<CombatantId>) -> MechResult<DamageReport> {
    let mut report = DamageReport::default();
    let slots = ctx.slots.clone();
    let kind = slots.damage_type.as_deref();

    if let Some(base) = slots.pending_damage {
        if let Some(target) = primary {
            let defenses = Defenses::gather(&slots, ctx.field.require(target)?, kind);
            let amount = mitigate(base, defenses, slots.ignore_armor, slots.ignore_resistance);
            report.primary = apply_hp_damage(ctx, target, amount, kind)?;
        }

        for &id in slots.aoe_targets.iter().filter(|id| Some(**id) != primary) {
            let defenses = Defenses::from_conditions(ctx.field.require(id)?, kind);
            let amount = mitigate(base, defenses, true, slots.ignore_resistance);
            let lost = apply_hp_damage(ctx, id, amount, kind)?;
            report.splash.push((id, lost));
        }

        if ctx.can_nest() && !slots.chain_targets.is_empty() {
            ctx.nested(|ctx| {
                for &id in &slots.chain_targets {
                    let arced = ctx.field.require(id)?;
                    if !arced.is_alive() {
                        continue;
                    }
                    let name = arced.name.clone();
                    let defenses = Defenses::from_conditions(arced, kind);
                    ctx.narrate(format!("The effect arcs to {name}."));
                    let amount = mitigate(base / 2, defenses, true, slots.ignore_resistance);
                    let lost = apply_hp_damage(ctx, id, amount, kind)?;
                    report.splash.push((id, lost));
                }
                Ok(())
            })?;
        }

        if report.primary > 0 {
            if let Some(pct) = slots.lifesteal_pct {
                let amount = report.primary * pct as i32 / 100;
                let actor = ctx.actor_mut()?;
                let gained = actor.heal(Pool::Hp, amount);
                let name = actor.name.clone();
                if gained > 0 {
                    ctx.narrate(format!("{name} drains {gained} HP."));
                }
                report.drained = gained;
            }
            if let (Some(pct), true) = (slots.reflect_pct, ctx.can_nest()) {
                let amount = report.primary * pct as i32 / 100;
                if amount > 0 {
                    let attacker = ctx.attacker;
                    ctx.narrate(format!("{amount} damage is reflected back!"));
                    report.reflected = ctx.nested(|ctx| apply_hp_damage(ctx, attacker, amount, None))?;
                }
            }
        }
    }

    if let (Some(amount), Some(target)) = (slots.pending_composure, primary) {
        let defender = ctx.field.require_mut(target)?;
        let lost = defender.damage_pool(Pool::Cmp, amount);
        let broken = defender.pool(Pool::Cmp).is_empty();
        let name = defender.name.clone();
        ctx.narrate(format!("{name} loses {lost} CMP."));
        if broken {
            ctx.narrate(format!("{name}'s composure breaks!"));
        }
    }

    Ok(report)
}
