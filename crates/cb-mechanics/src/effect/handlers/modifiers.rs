//! Roll modifiers and defenses. These only flip or accumulate slots.

use super::canonical_damage_type;
use crate::effect::catalog::HandlerArgs;
use crate::effect::context::ResolutionSlots;
use crate::effect::registry::{Handler, handler};
use crate::error::MechResult;

/// A boolean slot a flag handler raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotFlag {
    /// Attacker rolls with advantage.
    Advantage,
    /// Attacker rolls with disadvantage.
    Disadvantage,
    /// Defender rolls with advantage.
    DefenseAdvantage,
    /// The attack cannot miss.
    AutoHit,
    /// Skip armor rank and damage reduction.
    IgnoreArmor,
    /// Skip resistance and immunity.
    IgnoreResistance,
    /// The defender cannot be crit.
    CritImmune,
}

impl SlotFlag {
    fn raise(self, slots: &mut ResolutionSlots) {
        match self {
            Self::Advantage => slots.advantage = true,
            Self::Disadvantage => slots.disadvantage = true,
            Self::DefenseAdvantage => slots.defense_advantage = true,
            Self::AutoHit => slots.auto_hit = true,
            Self::IgnoreArmor => slots.ignore_armor = true,
            Self::IgnoreResistance => slots.ignore_resistance = true,
            Self::CritImmune => slots.crit_immune = true,
        }
    }
}

fn flag(which: SlotFlag) -> Handler {
    handler(move |_, ctx| {
        which.raise(&mut ctx.slots);
        Ok(())
    })
}

/// Raise the advantage slot.
pub fn advantage(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(flag(SlotFlag::Advantage))
}

/// Raise the disadvantage slot.
pub fn disadvantage(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(flag(SlotFlag::Disadvantage))
}

/// Raise the defender's advantage slot.
pub fn defense_advantage(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(flag(SlotFlag::DefenseAdvantage))
}

/// Raise the auto-hit slot.
pub fn auto_hit(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(flag(SlotFlag::AutoHit))
}

/// Raise the ignore-armor slot.
pub fn ignore_armor(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(flag(SlotFlag::IgnoreArmor))
}

/// Raise the ignore-resistance slot.
pub fn ignore_resistance(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(flag(SlotFlag::IgnoreResistance))
}

/// Raise the crit-immunity slot.
pub fn crit_immunity(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(flag(SlotFlag::CritImmune))
}

/// Add to the attack bonus. Captures: `bonus`.
pub fn to_hit(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let bonus = m.int("bonus")?.unwrap_or(0);
        ctx.slots.add_attack_bonus(bonus);
        Ok(())
    }))
}

/// Add to the defense bonus. Captures: `bonus`.
pub fn defense_bonus(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let bonus = m.int("bonus")?.unwrap_or(0);
        ctx.slots.add_defense_bonus(bonus);
        Ok(())
    }))
}

/// Lower the natural crit face. Captures: `face`. Clamped to 2..=20 and
/// never raised by a later rule.
pub fn crit_range(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let face = m.int("face")?.unwrap_or(20).clamp(2, 20) as u32;
        let current = ctx.crit_threshold();
        ctx.slots.crit_threshold = Some(current.min(face));
        Ok(())
    }))
}

/// Add to the damage reduction. Captures: `amount` or `amount2`.
pub fn damage_reduction(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(handler(|m, ctx| {
        let amount = match m.int("amount")? {
            Some(n) => n,
            None => m.int("amount2")?.unwrap_or(0),
        };
        ctx.slots.add_damage_reduction(amount);
        Ok(())
    }))
}

/// Which defensive list a damage type is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Defense {
    Resist,
    Immune,
    Vulnerable,
}

fn defense(kind: Defense) -> Handler {
    handler(move |m, ctx| {
        let damage_type = canonical_damage_type(m.require("kind")?);
        let list = match kind {
            Defense::Resist => &mut ctx.slots.resistances,
            Defense::Immune => &mut ctx.slots.immunities,
            Defense::Vulnerable => &mut ctx.slots.vulnerabilities,
        };
        if !list.contains(&damage_type) {
            list.push(damage_type);
        }
        Ok(())
    })
}

/// Record a resisted damage type. Captures: `kind`.
pub fn resistance(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(defense(Defense::Resist))
}

/// Record a damage type the defender is immune to. Captures: `kind`.
pub fn immunity(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(defense(Defense::Immune))
}

/// Record a damage type the defender is vulnerable to. Captures: `kind`.
pub fn vulnerability(_args: &HandlerArgs) -> MechResult<Handler> {
    Ok(defense(Defense::Vulnerable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dice::ScriptedRoller;
    use crate::effect::context::{Hook, ResolutionContext};
    use crate::effect::registry::{EffectRegistry, EffectRule};
    use cb_core::{Attributes, Battlefield, Combatant, TileGrid};

    #[test]
    fn modifiers_accumulate() {
        let rule = |name: &str, pattern: &str, h: Handler| {
            EffectRule::new(name, pattern, &[Hook::OnAttack], h).unwrap()
        };
        let registry = EffectRegistry::new()
            .with_rule(rule("to_hit", r"\+(?P<bonus>\d+)\s+to\s+hit", to_hit(&HandlerArgs::new()).unwrap()))
            .with_rule(rule("crit", r"crits?\s+on\s+(?P<face>\d+)", crit_range(&HandlerArgs::new()).unwrap()))
            .with_rule(rule("adv", r"\badvantage\b", advantage(&HandlerArgs::new()).unwrap()))
            .with_rule(rule("resist", r"resist\s+(?P<kind>\w+)", resistance(&HandlerArgs::new()).unwrap()));
        let mut field = Battlefield::new(TileGrid::new(2, 2));
        let a = field.add(Combatant::new("A", Attributes::new())).unwrap();
        let mut dice = ScriptedRoller::default();
        let config = EngineConfig::default();
        let mut ctx = ResolutionContext::new(&mut field, &mut dice, &config, a, None, Hook::OnAttack);

        registry.resolve("+2 to hit", &mut ctx);
        registry.resolve("+1 to hit, crits on 18", &mut ctx);
        registry.resolve("crits on 19", &mut ctx);
        registry.resolve("disadvantage", &mut ctx);
        registry.resolve("Resist fire. Resist FIRE.", &mut ctx);
        assert_eq!(ctx.slots.attack_bonus, Some(3));
        assert_eq!(ctx.crit_threshold(), 18);
        assert!(!ctx.slots.advantage, "word boundary keeps 'disadvantage' out");
        assert_eq!(ctx.slots.resistances, vec!["Fire"]);
    }
}
