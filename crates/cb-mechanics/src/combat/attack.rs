//! The attack state machine.
//!
//! `Idle → RollAttack → ResolveAttackHooks → RollDefense →
//! ResolveDefenseHooks → Outcome`. Both d20 pairs are drawn before the
//! hooks run so that effect text can flip advantage without changing
//! which faces were rolled. Damage is applied only at the outcome, after
//! every hook has had its say.

use cb_core::{CombatantId, Pool, Stat};
use serde::{Deserialize, Serialize};

use super::damage::{DamageReport, deliver, inflict_injury, roll_injury};
use super::outcome::{AttackTier, classify, effective_margin};
use super::tactics::Tactics;
use super::{CombatEngine, CombatState, PendingClash};
use crate::dice::{D20Roll, RollMode};
use crate::effect::{HandlerFault, Hook, ResolutionContext};
use crate::error::{MechError, MechResult};

/// An attack declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRequest {
    /// Who attacks.
    pub attacker: CombatantId,
    /// Who is attacked.
    pub target: CombatantId,
    /// Attack stat; also the default clash stat.
    pub stat: Stat,
    /// Stat the defender rolls with.
    pub defense_stat: Stat,
    /// Weapon or skill whose rank is added.
    pub skill: Option<String>,
    /// Effect texts of the weapon or maneuver, on top of the attacker's
    /// aggregated sources.
    pub effects: Vec<String>,
    /// Ability tier for damage text without dice.
    pub tier: u32,
}

impl AttackRequest {
    /// A Might attack against Reflexes with no weapon text.
    pub fn new(attacker: CombatantId, target: CombatantId) -> Self {
        Self {
            attacker,
            target,
            stat: Stat::Might,
            defense_stat: Stat::Reflexes,
            skill: None,
            effects: Vec::new(),
            tier: 1,
        }
    }

    /// Set the attack stat, builder style.
    pub fn with_stat(mut self, stat: Stat) -> Self {
        self.stat = stat;
        self
    }

    /// Set the defense stat, builder style.
    pub fn with_defense_stat(mut self, stat: Stat) -> Self {
        self.defense_stat = stat;
        self
    }

    /// Add a weapon or skill rank, builder style.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skill = Some(skill.into());
        self
    }

    /// Add an effect text, builder style.
    pub fn with_effect(mut self, text: impl Into<String>) -> Self {
        self.effects.push(text.into());
        self
    }

    /// Set the ability tier, builder style.
    pub fn with_tier(mut self, tier: u32) -> Self {
        self.tier = tier;
        self
    }
}

/// A state the attack passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackPhase {
    /// Declared, nothing rolled.
    Idle,
    /// Attack dice drawn.
    RollAttack,
    /// ON_ATTACK text resolved.
    ResolveAttackHooks,
    /// Defense dice drawn.
    RollDefense,
    /// ON_DEFEND text resolved.
    ResolveDefenseHooks,
    /// Final tier.
    Outcome(AttackTier),
}

/// One side's roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollLine {
    /// Both faces drawn.
    pub dice: D20Roll,
    /// Which face was kept.
    pub mode: RollMode,
    /// Kept face.
    pub natural: u32,
    /// Face plus every modifier.
    pub total: i32,
}

/// Everything an attack did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    /// Who attacked.
    pub attacker: CombatantId,
    /// Who was attacked.
    pub target: CombatantId,
    /// States visited, in order.
    pub phases: Vec<AttackPhase>,
    /// Positional modifiers found before rolling.
    pub tactics: Tactics,
    /// Attack roll. `None` if the attack was aborted.
    pub attack: Option<RollLine>,
    /// Defense roll. `None` if the attack was aborted.
    pub defense: Option<RollLine>,
    /// Margin after auto-hit.
    pub margin: Option<i32>,
    /// Outcome. `None` if the attack was aborted.
    pub tier: Option<AttackTier>,
    /// HP changes from the damage payload.
    pub damage: DamageReport,
    /// Crit injury inflicted, by name.
    pub injury: Option<&'static str>,
    /// A cost could not be paid; nothing else happened.
    pub aborted: bool,
    /// Handler faults skipped during resolution.
    pub faults: Vec<HandlerFault>,
    /// Narrative lines.
    pub log: Vec<String>,
}

impl AttackReport {
    fn new(request: &AttackRequest, tactics: Tactics) -> Self {
        Self {
            attacker: request.attacker,
            target: request.target,
            phases: vec![AttackPhase::Idle],
            tactics,
            attack: None,
            defense: None,
            margin: None,
            tier: None,
            damage: DamageReport::default(),
            injury: None,
            aborted: false,
            faults: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Returns true if the attack hit or crit.
    pub fn landed(&self) -> bool {
        self.tier.is_some_and(AttackTier::lands)
    }
}

impl CombatEngine<'_> {
    /// Resolve an attack. Consumes the attacker's action unless a cost
    /// aborts it. A tie leaves the engine in the clash state with both
    /// combatants' HP untouched.
    pub fn attack(&mut self, request: AttackRequest) -> MechResult<AttackReport> {
        self.require_action(request.attacker)?;
        let target = self.field.require(request.target)?;
        if request.target == request.attacker || !target.is_alive() {
            return Err(MechError::InvalidTarget(target.name.clone()));
        }
        let attacker = self.field.require(request.attacker)?;
        let tactics = Tactics::assess(&self.field, attacker, target);
        let attacker_name = attacker.name.clone();
        let target_name = target.name.clone();
        let registry = self.registry;
        let mut report = AttackReport::new(&request, tactics);

        report.phases.push(AttackPhase::RollAttack);
        let attack_dice = D20Roll::roll(self.dice.as_mut());

        let mut ctx = ResolutionContext::new(
            &mut self.field,
            self.dice.as_mut(),
            &self.config,
            request.attacker,
            Some(request.target),
            Hook::OnAttack,
        )
        .with_tier(request.tier);
        ctx.slots.advantage = report.tactics.has_advantage();
        ctx.slots.disadvantage = report.tactics.has_disadvantage();

        report.phases.push(AttackPhase::ResolveAttackHooks);
        self.sources
            .dispatch(registry, request.attacker, &request.effects, Hook::OnAttack, &mut ctx);
        if ctx.slots.aborted {
            report.aborted = true;
            report.faults = std::mem::take(&mut ctx.faults);
            report.log = std::mem::take(&mut ctx.log);
            tracing::debug!(attacker = %attacker_name, "attack aborted");
            self.record(
                Some(request.attacker),
                format!("Attack {target_name}"),
                None,
                report.log.clone(),
            );
            return Ok(report);
        }

        let mode = RollMode::from_flags(ctx.slots.advantage, ctx.slots.disadvantage);
        let natural = attack_dice.natural(mode);
        let attacker = ctx.actor()?;
        let rank = request
            .skill
            .as_deref()
            .map_or(0, |skill| attacker.skill_rank(skill));
        let attack_total = (natural as i32 + attacker.modifier(request.stat))
            .saturating_add(rank)
            .saturating_add(ctx.slots.attack_bonus.unwrap_or(0));
        ctx.slots.attack_roll = Some(attack_total);
        report.attack = Some(RollLine {
            dice: attack_dice,
            mode,
            natural,
            total: attack_total,
        });

        report.phases.push(AttackPhase::RollDefense);
        let defense_dice = D20Roll::roll(&mut *ctx.dice);

        report.phases.push(AttackPhase::ResolveDefenseHooks);
        self.sources
            .dispatch(registry, request.target, &[], Hook::OnDefend, &mut ctx);
        let defense_mode = RollMode::from_flags(ctx.slots.defense_advantage, false);
        let defense_natural = defense_dice.natural(defense_mode);
        let defender = ctx.target()?;
        let armor = if ctx.slots.ignore_armor { 0 } else { defender.armor_rank };
        let defense_total = (defense_natural as i32 + defender.modifier(request.defense_stat))
            .saturating_add(armor)
            .saturating_add(ctx.slots.defense_bonus.unwrap_or(0));
        report.defense = Some(RollLine {
            dice: defense_dice,
            mode: defense_mode,
            natural: defense_natural,
            total: defense_total,
        });

        let margin = effective_margin(attack_total.saturating_sub(defense_total), ctx.slots.auto_hit);
        let mut tier = classify(margin, natural, ctx.crit_threshold(), ctx.config.thresholds);
        ctx.narrate(format!(
            "{attacker_name} attacks {target_name}: {attack_total} vs {defense_total}."
        ));
        if tier == AttackTier::Crit && ctx.slots.crit_immune {
            tier = AttackTier::Hit;
            ctx.narrate(format!("{target_name} turns the critical blow aside."));
        }
        ctx.slots.is_crit = tier == AttackTier::Crit;
        report.margin = Some(margin);
        report.tier = Some(tier);
        report.phases.push(AttackPhase::Outcome(tier));

        match tier {
            AttackTier::Clash => {
                ctx.narrate(format!("{attacker_name} and {target_name} clash!"));
            }
            AttackTier::Miss => {
                ctx.narrate(format!("{attacker_name} misses {target_name}."));
            }
            AttackTier::Graze => {
                let chip = ctx.config.graze_composure;
                let lost = ctx.target_mut()?.damage_pool(Pool::Cmp, chip);
                ctx.narrate(format!("{target_name} is grazed and loses {lost} CMP."));
            }
            AttackTier::Hit | AttackTier::Crit => {
                ctx.narrate(match tier {
                    AttackTier::Crit => format!("Critical hit on {target_name}!"),
                    _ => format!("{attacker_name} hits {target_name}."),
                });
                self.sources
                    .dispatch(registry, request.attacker, &request.effects, Hook::OnHit, &mut ctx);
                if ctx.slots.pending_damage.is_none() {
                    let unarmed = ctx.config.unarmed_damage.clone();
                    let rolled = ctx.roll(&unarmed) + ctx.actor()?.modifier(request.stat);
                    ctx.slots.add_damage(rolled.max(1), None);
                }
                if let (AttackTier::Crit, Some(pending)) = (tier, ctx.slots.pending_damage.as_mut()) {
                    *pending = pending.saturating_mul(2);
                }
                report.damage = deliver(&mut ctx, Some(request.target))?;
                if tier == AttackTier::Crit && ctx.target()?.is_alive() {
                    let injury = roll_injury(&mut *ctx.dice);
                    inflict_injury(&mut ctx, request.target, injury)?;
                    report.injury = Some(injury.name);
                }
            }
        }

        report.faults = std::mem::take(&mut ctx.faults);
        report.log = std::mem::take(&mut ctx.log);
        tracing::debug!(
            attacker = %attacker_name,
            target = %target_name,
            attack_total,
            defense_total,
            margin,
            %tier,
            "attack resolved"
        );

        if tier == AttackTier::Clash {
            self.state = CombatState::Clash(PendingClash {
                attacker: request.attacker,
                defender: request.target,
                stat: request.stat,
            });
        }
        self.field.require_mut(request.attacker)?.turn.action_used = true;
        self.record(
            Some(request.attacker),
            format!("Attack {target_name}"),
            Some(tier),
            report.log.clone(),
        );
        self.check_finished();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dice::ScriptedRoller;
    use crate::effect::EffectRegistry;
    use crate::sources::StaticSources;
    use cb_core::{Attributes, Battlefield, Combatant, TileGrid};

    struct Arena {
        field: Battlefield,
        a: CombatantId,
        d: CombatantId,
    }

    fn arena() -> Arena {
        let mut field = Battlefield::new(TileGrid::new(8, 8));
        let a = field
            .add(
                Combatant::new("Aria", Attributes::new())
                    .with_team("red")
                    .at(2, 2)
                    .with_initiative(20),
            )
            .unwrap();
        let d = field
            .add(
                Combatant::new("Dorn", Attributes::new())
                    .with_team("blue")
                    .at(3, 2)
                    .facing(cb_core::Facing::West)
                    .with_initiative(1),
            )
            .unwrap();
        Arena { field, a, d }
    }

    fn engine<'r>(registry: &'r EffectRegistry, arena: Arena, faces: &[u32]) -> CombatEngine<'r> {
        let mut engine = CombatEngine::new(registry, arena.field, EngineConfig::default())
            .with_dice(ScriptedRoller::new(faces.iter().copied()));
        engine.start().unwrap();
        engine
    }

    #[test]
    fn phases_are_visited_in_order() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        let mut engine = engine(&registry, arena, &[5, 1, 15, 1]);
        let report = engine.attack(AttackRequest::new(a, d)).unwrap();
        assert_eq!(
            report.phases,
            vec![
                AttackPhase::Idle,
                AttackPhase::RollAttack,
                AttackPhase::ResolveAttackHooks,
                AttackPhase::RollDefense,
                AttackPhase::ResolveDefenseHooks,
                AttackPhase::Outcome(AttackTier::Miss),
            ]
        );
        assert_eq!(report.margin, Some(-10));
        assert!(!report.landed());
    }

    #[test]
    fn action_is_spent_once() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        let mut engine = engine(&registry, arena, &[5, 1, 15, 1]);
        engine.attack(AttackRequest::new(a, d)).unwrap();
        let err = engine.attack(AttackRequest::new(a, d)).unwrap_err();
        assert!(matches!(err, MechError::ActionUsed(name) if name == "Aria"));
        let err = engine.attack(AttackRequest::new(d, a)).unwrap_err();
        assert!(matches!(err, MechError::NotYourTurn(name) if name == "Dorn"));
    }

    #[test]
    fn graze_chips_composure_only() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        let hp = arena.field.get(d).unwrap().hp();
        let cmp = arena.field.get(d).unwrap().pool(Pool::Cmp).current;
        let mut engine = engine(&registry, arena, &[12, 1, 10, 1]);
        let report = engine
            .attack(AttackRequest::new(a, d).with_effect("Deal 2d6 fire damage"))
            .unwrap();
        assert_eq!(report.tier, Some(AttackTier::Graze));
        let dorn = engine.field().get(d).unwrap();
        assert_eq!(dorn.hp(), hp);
        assert_eq!(dorn.pool(Pool::Cmp).current, cmp - 1);
    }

    #[test]
    fn unarmed_fallback_adds_the_stat() {
        let registry = EffectRegistry::standard().unwrap();
        let mut arena = arena();
        arena.field.get_mut(arena.a).unwrap().attributes.set(Stat::Might, 14);
        let (a, d) = (arena.a, arena.d);
        let hp = arena.field.get(d).unwrap().hp();
        // 1d4 unarmed rolls a 3.
        let mut engine = engine(&registry, arena, &[15, 1, 8, 1, 3]);
        let report = engine.attack(AttackRequest::new(a, d)).unwrap();
        assert_eq!(report.tier, Some(AttackTier::Hit));
        assert_eq!(report.damage.primary, 5);
        assert_eq!(engine.field().get(d).unwrap().hp(), hp - 5);
    }

    #[test]
    fn crit_doubles_and_injures() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        // Natural 20, damage 1d6 rolls 4, injury d6 rolls 5 (Concussed).
        let mut engine = engine(&registry, arena, &[20, 1, 15, 1, 4, 5]);
        let report = engine
            .attack(AttackRequest::new(a, d).with_effect("Deal 1d6 damage"))
            .unwrap();
        assert_eq!(report.tier, Some(AttackTier::Crit));
        assert_eq!(report.damage.primary, 8);
        assert_eq!(report.injury, Some("Concussed"));
        let dorn = engine.field().get(d).unwrap();
        assert!(dorn.has_condition("Stunned"));
        assert!(dorn.has_flag("stunned"));
    }

    #[test]
    fn crit_immunity_downgrades_to_hit() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        let sources = StaticSources::new().with_trait(d, "Stoneskin", "Immune to critical hits");
        let mut engine = CombatEngine::new(&registry, arena.field, EngineConfig::default())
            .with_dice(ScriptedRoller::new([20, 1, 15, 1, 4]))
            .with_sources(sources);
        engine.start().unwrap();
        let report = engine
            .attack(AttackRequest::new(a, d).with_effect("Deal 1d6 damage"))
            .unwrap();
        assert_eq!(report.tier, Some(AttackTier::Hit));
        assert_eq!(report.damage.primary, 4);
        assert_eq!(report.injury, None);
    }

    #[test]
    fn auto_hit_turns_a_tie_into_a_graze() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        let mut engine = engine(&registry, arena, &[10, 1, 10, 1]);
        let report = engine
            .attack(AttackRequest::new(a, d).with_effect("Never misses"))
            .unwrap();
        assert_eq!(report.margin, Some(1));
        assert_eq!(report.tier, Some(AttackTier::Graze));
        assert_eq!(engine.state(), &CombatState::Active);
    }

    #[test]
    fn natural_crit_overrides_a_losing_margin() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        let sources = StaticSources::new().with_trait(d, "Bulwark", "+30 to defense");
        let mut engine = CombatEngine::new(&registry, arena.field, EngineConfig::default())
            .with_dice(ScriptedRoller::new([20, 1, 10, 1, 4, 1]))
            .with_sources(sources);
        engine.start().unwrap();
        let report = engine
            .attack(AttackRequest::new(a, d).with_effect("Deal 1d6 damage"))
            .unwrap();
        assert!(report.margin.is_some_and(|m| m < 0));
        assert_eq!(report.tier, Some(AttackTier::Crit));
        assert_eq!(report.damage.primary, 8);
    }

    #[test]
    fn overflowing_bonuses_saturate() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        let hp = arena.field.get(d).unwrap().hp();
        let mut engine = engine(&registry, arena, &[5, 1, 10, 1]);
        let report = engine
            .attack(
                AttackRequest::new(a, d)
                    .with_effect("+2000000000 to hit")
                    .with_effect("+2000000000 to hit")
                    .with_effect("Deal 2000000000 damage")
                    .with_effect("Deal 2000000000 damage"),
            )
            .unwrap();
        assert!(report.margin.is_some_and(|m| m > 0));
        assert_eq!(report.tier, Some(AttackTier::Crit));
        assert_eq!(report.damage.primary, hp);
        assert!(!engine.field().get(d).unwrap().is_alive());
    }

    #[test]
    fn on_attack_advantage_keeps_the_higher_face() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        let mut engine = engine(&registry, arena, &[3, 17, 10, 1]);
        let report = engine
            .attack(AttackRequest::new(a, d).with_effect("Advantage on attack rolls"))
            .unwrap();
        let roll = report.attack.unwrap();
        assert_eq!(roll.mode, RollMode::Advantage);
        assert_eq!(roll.natural, 17);
    }

    #[test]
    fn cannot_attack_the_fallen_or_yourself() {
        let registry = EffectRegistry::standard().unwrap();
        let mut arena = arena();
        let (a, d) = (arena.a, arena.d);
        arena
            .field
            .add(
                Combatant::new("Ghost", Attributes::new())
                    .with_team("blue")
                    .at(6, 6),
            )
            .unwrap();
        let mut engine = engine(&registry, arena, &[]);
        assert!(matches!(
            engine.attack(AttackRequest::new(a, a)),
            Err(MechError::InvalidTarget(_))
        ));
        engine.field_mut().get_mut(d).unwrap().take_damage(999);
        assert!(matches!(
            engine.attack(AttackRequest::new(a, d)),
            Err(MechError::InvalidTarget(_))
        ));
    }

    #[test]
    fn defender_text_resolves_on_defend() {
        let registry = EffectRegistry::standard().unwrap();
        let arena = arena();
        let (a, d) = (arena.a, arena.d);
        let sources = StaticSources::new().with_trait(d, "Guard", "+3 defense");
        let mut engine = CombatEngine::new(&registry, arena.field, EngineConfig::default())
            .with_dice(ScriptedRoller::new([13, 1, 10, 1]))
            .with_sources(sources);
        engine.start().unwrap();
        let report = engine.attack(AttackRequest::new(a, d)).unwrap();
        assert_eq!(report.defense.unwrap().total, 13);
        assert_eq!(report.tier, Some(AttackTier::Clash));
        assert!(engine.pending_clash().is_some());
        assert_eq!(report.damage, DamageReport::default());
    }
}
