use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grid::{Facing, Position};
use crate::pool::{Pool, Pools, ResourcePool};
use crate::stat::{Attributes, Stat};
use crate::status::{EffectDuration, Expired, StatusSet};

/// Conditions that stop a combatant from taking actions.
pub const INCAPACITATING: [&str; 2] = ["Stunned", "Paralyzed"];

/// Unique identifier for every combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Side a combatant fights on. Allies share a team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Team(pub String);

impl Team {
    /// Create a team from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-turn action economy, reset at the start of the owner's turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEconomy {
    /// The main action was spent.
    pub action_used: bool,
    /// The bonus action was spent.
    pub bonus_action_used: bool,
    /// The reaction was spent.
    pub reaction_used: bool,
    /// Movement was spent.
    pub moved: bool,
}

impl TurnEconomy {
    /// Clear every flag.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A mutable combatant record.
///
/// Carries no turn logic. The combat engine and effect handlers mutate it
/// through the damage, heal, spend and condition primitives below, which
/// keep pools clamped and depletion flags in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    /// Unique identifier.
    pub id: CombatantId,
    /// Display name.
    pub name: String,
    /// Species or archetype tag. Informational only.
    pub archetype: String,
    /// Which side this combatant is on.
    pub team: Team,
    /// Stat scores.
    pub attributes: Attributes,
    /// HP, CMP, SP and FP.
    pub pools: Pools,
    /// Grid cell.
    pub position: Position,
    /// Facing, used for rear attacks.
    pub facing: Facing,
    /// Height above the ground plane.
    pub elevation: i32,
    /// Fixed initiative score; rolled at combat start when absent.
    pub initiative: Option<i32>,
    /// Weapon and skill ranks keyed by name.
    pub skill_ranks: BTreeMap<String, i32>,
    /// Armor rank added to defense totals.
    pub armor_rank: i32,
    /// Active conditions.
    pub conditions: StatusSet,
    /// Boolean attributes (e.g. "stunned", "dying", "phasing").
    pub flags: BTreeSet<String>,
    /// Turn economy.
    pub turn: TurnEconomy,
}

impl Combatant {
    /// Create a combatant with full pools derived from its attributes.
    pub fn new(name: impl Into<String>, attributes: Attributes) -> Self {
        let pools = Pools::from_attributes(&attributes);
        Self {
            id: CombatantId::new(),
            name: name.into(),
            archetype: String::new(),
            team: Team::default(),
            attributes,
            pools,
            position: Position::default(),
            facing: Facing::default(),
            elevation: 0,
            initiative: None,
            skill_ranks: BTreeMap::new(),
            armor_rank: 0,
            conditions: StatusSet::new(),
            flags: BTreeSet::new(),
            turn: TurnEconomy::default(),
        }
    }

    /// Set the team, builder style.
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Team::new(team);
        self
    }

    /// Set the archetype tag, builder style.
    pub fn with_archetype(mut self, archetype: impl Into<String>) -> Self {
        self.archetype = archetype.into();
        self
    }

    /// Place at a grid cell, builder style.
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Set the facing, builder style.
    pub fn facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    /// Set the elevation, builder style.
    pub fn with_elevation(mut self, elevation: i32) -> Self {
        self.elevation = elevation;
        self
    }

    /// Fix the initiative score, builder style.
    pub fn with_initiative(mut self, initiative: i32) -> Self {
        self.initiative = Some(initiative);
        self
    }

    /// Add a weapon or skill rank, builder style.
    pub fn with_skill(mut self, skill: impl Into<String>, rank: i32) -> Self {
        self.skill_ranks.insert(skill.into(), rank);
        self
    }

    /// Set the armor rank, builder style.
    pub fn with_armor(mut self, rank: i32) -> Self {
        self.armor_rank = rank;
        self
    }

    /// Override a pool's current value, builder style (clamped).
    pub fn with_pool(mut self, pool: Pool, current: i32) -> Self {
        let max = self.pools.get(pool).max;
        *self.pools.get_mut(pool) = ResourcePool::with_current(current, max);
        self.sync_depleted(pool);
        self
    }

    /// Stat modifier.
    pub fn modifier(&self, stat: Stat) -> i32 {
        self.attributes.modifier(stat)
    }

    /// Rank in a weapon or skill, 0 if untrained. Case-insensitive.
    pub fn skill_rank(&self, skill: &str) -> i32 {
        self.skill_ranks
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(skill))
            .map(|(_, rank)| *rank)
            .unwrap_or(0)
    }

    /// A pool's state.
    pub fn pool(&self, pool: Pool) -> &ResourcePool {
        self.pools.get(pool)
    }

    /// Current HP.
    pub fn hp(&self) -> i32 {
        self.pools.hp.current
    }

    /// HP above zero.
    pub fn is_alive(&self) -> bool {
        !self.pools.hp.is_empty()
    }

    /// Stunned, paralyzed, or down.
    pub fn is_incapacitated(&self) -> bool {
        !self.is_alive() || INCAPACITATING.iter().any(|c| self.conditions.has(c))
    }

    /// Apply HP damage, clamped at zero. Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        self.damage_pool(Pool::Hp, amount)
    }

    /// Remove from any pool, clamped at zero. Returns the amount lost.
    pub fn damage_pool(&mut self, pool: Pool, amount: i32) -> i32 {
        let lost = self.pools.get_mut(pool).drain(amount);
        self.sync_depleted(pool);
        lost
    }

    /// Restore any pool, clamped at max. Returns the amount gained.
    pub fn heal(&mut self, pool: Pool, amount: i32) -> i32 {
        let gained = self.pools.get_mut(pool).restore(amount);
        self.sync_depleted(pool);
        gained
    }

    /// Deduct a cost only if the pool covers it.
    pub fn spend(&mut self, pool: Pool, amount: i32) -> bool {
        let ok = self.pools.get_mut(pool).try_spend(amount);
        if ok {
            self.sync_depleted(pool);
        }
        ok
    }

    /// Apply a condition, extending an existing one. When `on_expire`
    /// names a flag, the flag is raised now and cleared on expiry.
    pub fn add_condition(
        &mut self,
        name: &str,
        duration: EffectDuration,
        on_expire: Option<&str>,
    ) -> Option<EffectDuration> {
        let applied = self
            .conditions
            .apply(name, duration, on_expire.map(str::to_string));
        if let (Some(_), Some(flag)) = (applied, on_expire) {
            self.flags.insert(flag.to_string());
        }
        applied
    }

    /// Returns true if a condition is active.
    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.has(name)
    }

    /// Clear a condition and its bound flag. Returns true if it was active.
    pub fn remove_condition(&mut self, name: &str) -> bool {
        match self.conditions.remove(name) {
            Some(effect) => {
                if let Some(flag) = effect.on_expire {
                    self.flags.remove(&flag);
                }
                true
            }
            None => false,
        }
    }

    /// Advance every timed condition by one round, clearing bound flags
    /// of the ones that expire.
    pub fn tick_conditions(&mut self) -> Vec<Expired> {
        let expired = self.conditions.tick();
        for effect in &expired {
            if let Some(flag) = &effect.on_expire {
                self.flags.remove(flag);
            }
            tracing::trace!(combatant = %self.name, condition = %effect.name, "condition expired");
        }
        expired
    }

    /// Raise a boolean flag.
    pub fn set_flag(&mut self, flag: &str) {
        self.flags.insert(flag.to_string());
    }

    /// Lower a boolean flag.
    pub fn clear_flag(&mut self, flag: &str) {
        self.flags.remove(flag);
    }

    /// Returns true if a boolean flag is raised.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Start-of-turn reset of the action economy.
    pub fn reset_turn(&mut self) {
        self.turn.reset();
    }

    fn sync_depleted(&mut self, pool: Pool) {
        let flag = pool.depleted_flag();
        if self.pools.get(pool).is_empty() {
            if self.flags.insert(flag.to_string()) {
                tracing::debug!(combatant = %self.name, pool = %pool, flag, "pool depleted");
            }
        } else {
            self.flags.remove(flag);
        }
    }
}
