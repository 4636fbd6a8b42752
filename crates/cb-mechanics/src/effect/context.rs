//! Per-resolution mutable state shared by every handler that fires.
//!
//! A context lives for exactly one action: it is built when the action
//! starts, threaded through every hook dispatch, then read back by the
//! engine and dropped. Handlers communicate only through its slots and
//! the combatants it borrows.

use std::fmt;

use cb_core::{Battlefield, Combatant, CombatantId};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::dice::{DiceExpr, DiceRoller};
use crate::error::{MechError, MechResult};

/// The point in an action where effect text is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Hook {
    /// An ability is used outside an attack.
    Activate,
    /// The attacker's texts, before the attack total is finalized.
    OnAttack,
    /// The defender's texts, before the defense total is finalized.
    OnDefend,
    /// The attacker's texts, after a hit or crit.
    OnHit,
}

impl Hook {
    /// Every hook.
    pub const ALL: [Hook; 4] = [Self::Activate, Self::OnAttack, Self::OnDefend, Self::OnHit];
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activate => write!(f, "ACTIVATE"),
            Self::OnAttack => write!(f, "ON_ATTACK"),
            Self::OnDefend => write!(f, "ON_DEFEND"),
            Self::OnHit => write!(f, "ON_HIT"),
        }
    }
}

/// Scratch values written by handlers and read by the engine.
///
/// Unset numeric slots are `None`, never a sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSlots {
    /// HP damage waiting to be mitigated and applied.
    pub pending_damage: Option<i32>,
    /// Composure damage waiting to be applied.
    pub pending_composure: Option<i32>,
    /// Damage type tag of the pending damage.
    pub damage_type: Option<String>,
    /// Finalized attack total, once known.
    pub attack_roll: Option<i32>,
    /// Flat bonus to the attack total.
    pub attack_bonus: Option<i32>,
    /// Flat bonus to the defense total.
    pub defense_bonus: Option<i32>,
    /// The attack cannot miss.
    pub auto_hit: bool,
    /// The attack is a critical hit.
    pub is_crit: bool,
    /// The attacker rolls with advantage.
    pub advantage: bool,
    /// The attacker rolls with disadvantage.
    pub disadvantage: bool,
    /// The defender rolls with advantage.
    pub defense_advantage: bool,
    /// Lowered natural crit face.
    pub crit_threshold: Option<u32>,
    /// The defender shrugs off crits.
    pub crit_immune: bool,
    /// Armor rank and damage reduction are skipped.
    pub ignore_armor: bool,
    /// Resistance and immunity are skipped.
    pub ignore_resistance: bool,
    /// Damage types the defender resists.
    pub resistances: Vec<String>,
    /// Damage types the defender is immune to.
    pub immunities: Vec<String>,
    /// Damage types the defender is vulnerable to.
    pub vulnerabilities: Vec<String>,
    /// Flat damage reduction on the defender.
    pub damage_reduction: Option<i32>,
    /// Secondary targets of an area effect.
    pub aoe_targets: Vec<CombatantId>,
    /// Targets a chain effect jumps to.
    pub chain_targets: Vec<CombatantId>,
    /// Percent of dealt damage the attacker heals.
    pub lifesteal_pct: Option<u32>,
    /// Percent of dealt damage sent back to the attacker.
    pub reflect_pct: Option<u32>,
    /// A cost could not be paid; nothing else may happen.
    pub aborted: bool,
}

impl ResolutionSlots {
    /// Add to the pending HP damage. The first damage type named wins.
    pub fn add_damage(&mut self, amount: i32, damage_type: Option<&str>) {
        self.pending_damage = Some(self.pending_damage.unwrap_or(0).saturating_add(amount.max(0)));
        if self.damage_type.is_none() {
            self.damage_type = damage_type.map(str::to_string);
        }
    }

    /// Add to the pending composure damage.
    pub fn add_composure(&mut self, amount: i32) {
        self.pending_composure = Some(self.pending_composure.unwrap_or(0).saturating_add(amount.max(0)));
    }

    /// Add to the attack bonus.
    pub fn add_attack_bonus(&mut self, bonus: i32) {
        self.attack_bonus = Some(self.attack_bonus.unwrap_or(0).saturating_add(bonus));
    }

    /// Add to the defense bonus.
    pub fn add_defense_bonus(&mut self, bonus: i32) {
        self.defense_bonus = Some(self.defense_bonus.unwrap_or(0).saturating_add(bonus));
    }

    /// Add to the damage reduction.
    pub fn add_damage_reduction(&mut self, amount: i32) {
        self.damage_reduction = Some(self.damage_reduction.unwrap_or(0).saturating_add(amount));
    }
}

/// A handler error that was caught and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
    /// Rule whose handler failed.
    pub rule: String,
    /// The effect text being resolved.
    pub text: String,
    /// Rendered error.
    pub error: String,
}

/// Everything a handler may read or change while one action resolves.
pub struct ResolutionContext<'a> {
    /// Combatants and terrain.
    pub field: &'a mut Battlefield,
    /// Shared dice.
    pub dice: &'a mut dyn DiceRoller,
    /// Tunable constants.
    pub config: &'a EngineConfig,
    /// The hook currently being dispatched.
    pub hook: Hook,
    /// The acting combatant.
    pub attacker: CombatantId,
    /// The primary target, if any.
    pub target: Option<CombatantId>,
    /// Tier of the ability being resolved; drives fallback damage.
    pub tier: u32,
    /// Narrative lines, in order.
    pub log: Vec<String>,
    /// Handler errors caught during dispatch.
    pub faults: Vec<HandlerFault>,
    /// Handler scratch values.
    pub slots: ResolutionSlots,
    /// Nesting level of reflect and chain applications.
    pub depth: u8,
}

impl<'a> ResolutionContext<'a> {
    /// Create a context for one action.
    pub fn new(
        field: &'a mut Battlefield,
        dice: &'a mut dyn DiceRoller,
        config: &'a EngineConfig,
        attacker: CombatantId,
        target: Option<CombatantId>,
        hook: Hook,
    ) -> Self {
        Self {
            field,
            dice,
            config,
            hook,
            attacker,
            target,
            tier: 1,
            log: Vec::new(),
            faults: Vec::new(),
            slots: ResolutionSlots::default(),
            depth: 0,
        }
    }

    /// Set the ability tier, builder style.
    pub fn with_tier(mut self, tier: u32) -> Self {
        self.tier = tier;
        self
    }

    /// Append a narrative line.
    pub fn narrate(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(hook = %self.hook, "{line}");
        self.log.push(line);
    }

    /// The acting combatant.
    pub fn actor(&self) -> MechResult<&Combatant> {
        Ok(self.field.require(self.attacker)?)
    }

    /// The acting combatant, mutably.
    pub fn actor_mut(&mut self) -> MechResult<&mut Combatant> {
        Ok(self.field.require_mut(self.attacker)?)
    }

    /// The primary target's id.
    pub fn target_id(&self) -> MechResult<CombatantId> {
        self.target.ok_or(MechError::MissingTarget)
    }

    /// The primary target.
    pub fn target(&self) -> MechResult<&Combatant> {
        Ok(self.field.require(self.target_id()?)?)
    }

    /// The primary target, mutably.
    pub fn target_mut(&mut self) -> MechResult<&mut Combatant> {
        let id = self.target_id()?;
        Ok(self.field.require_mut(id)?)
    }

    /// The target when there is one, else the actor.
    pub fn target_or_self(&self) -> CombatantId {
        self.target.unwrap_or(self.attacker)
    }

    /// Roll a dice expression with the shared dice.
    pub fn roll(&mut self, expr: &DiceExpr) -> i32 {
        expr.roll(&mut *self.dice).total()
    }

    /// The natural face that crits, after any lowering.
    pub fn crit_threshold(&self) -> u32 {
        self.slots
            .crit_threshold
            .unwrap_or(self.config.crit_threshold)
    }

    /// Returns true if another reflect or chain application may happen.
    pub fn can_nest(&self) -> bool {
        self.depth < self.config.max_chain_depth
    }

    /// Run `apply` one nesting level deeper, restoring the depth afterwards.
    pub fn nested<R>(&mut self, apply: impl FnOnce(&mut Self) -> MechResult<R>) -> MechResult<R> {
        let outer = self.depth;
        self.depth = outer.saturating_add(1);
        let result = apply(self);
        self.depth = outer;
        result
    }
}

impl fmt::Debug for ResolutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("hook", &self.hook)
            .field("attacker", &self.attacker)
            .field("target", &self.target)
            .field("tier", &self.tier)
            .field("slots", &self.slots)
            .field("log_len", &self.log.len())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}
