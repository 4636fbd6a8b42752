//! Resource pools (HP, CMP, SP, FP).
//!
//! A pool is a clamped numeric value between 0 and its maximum. The
//! maximum of each pool is a fixed linear formula over three stats.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::stat::{Attributes, Stat};

/// Which resource pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pool {
    /// Hit points: physical condition.
    #[serde(rename = "HP")]
    Hp,
    /// Composure: mental condition.
    #[serde(rename = "CMP")]
    Cmp,
    /// Stamina.
    #[serde(rename = "SP")]
    Sp,
    /// Focus (mana).
    #[serde(rename = "FP")]
    Fp,
}

impl Pool {
    /// All pools.
    pub const ALL: [Pool; 4] = [Pool::Hp, Pool::Cmp, Pool::Sp, Pool::Fp];

    /// Short tag as written in effect text ("HP", "CMP", "SP", "FP").
    pub fn tag(self) -> &'static str {
        match self {
            Self::Hp => "HP",
            Self::Cmp => "CMP",
            Self::Sp => "SP",
            Self::Fp => "FP",
        }
    }

    /// Flat base added to the stat sum when deriving the maximum.
    pub fn base(self) -> i32 {
        match self {
            Self::Hp | Self::Cmp => 10,
            Self::Sp | Self::Fp => 0,
        }
    }

    /// The three stats whose scores feed the maximum.
    ///
    /// - HP = 10 + Might + Reflexes + Vitality
    /// - CMP = 10 + Willpower + Logic + Awareness
    /// - SP = Endurance + Finesse + Fortitude
    /// - FP = Knowledge + Charm + Intuition
    pub fn formula(self) -> [Stat; 3] {
        match self {
            Self::Hp => [Stat::Might, Stat::Reflexes, Stat::Vitality],
            Self::Cmp => [Stat::Willpower, Stat::Logic, Stat::Awareness],
            Self::Sp => [Stat::Endurance, Stat::Finesse, Stat::Fortitude],
            Self::Fp => [Stat::Knowledge, Stat::Charm, Stat::Intuition],
        }
    }

    /// Maximum for this pool given a set of attributes.
    pub fn max_for(self, attributes: &Attributes) -> i32 {
        (self.base() + attributes.sum(&self.formula())).max(0)
    }

    /// Name of the flag raised on the owner when this pool hits zero.
    pub fn depleted_flag(self) -> &'static str {
        match self {
            Self::Hp => "dying",
            Self::Cmp => "broken",
            Self::Sp => "exhausted",
            Self::Fp => "drained",
        }
    }

    /// Parse a pool from its tag or long name, ignoring case.
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hp" | "hit points" | "health" => Ok(Self::Hp),
            "cmp" | "composure" => Ok(Self::Cmp),
            "sp" | "stamina" => Ok(Self::Sp),
            "fp" | "focus" | "mana" => Ok(Self::Fp),
            other => Err(CoreError::UnknownPool(other.to_string())),
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A clamped resource value: `0 <= current <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    /// Current value.
    pub current: i32,
    /// Maximum value.
    pub max: i32,
}

impl ResourcePool {
    /// Create a pool starting at its maximum.
    pub fn new(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    /// Create a pool with a custom starting value, clamped into range.
    pub fn with_current(current: i32, max: i32) -> Self {
        let max = max.max(0);
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    /// Adjust by a delta, clamping to bounds. Returns the new value.
    pub fn adjust(&mut self, delta: i32) -> i32 {
        self.current = self.current.saturating_add(delta).clamp(0, self.max);
        self.current
    }

    /// Remove up to `amount`. Returns how much was actually removed.
    pub fn drain(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.adjust(-amount.max(0));
        before - self.current
    }

    /// Add up to `amount`. Returns how much was actually restored.
    pub fn restore(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.adjust(amount.max(0));
        self.current - before
    }

    /// Deduct `amount` only if the pool can cover it.
    pub fn try_spend(&mut self, amount: i32) -> bool {
        if amount < 0 || self.current < amount {
            return false;
        }
        self.current -= amount;
        true
    }

    /// Change the maximum, clamping the current value into the new range.
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        self.current = self.current.min(self.max);
    }

    /// Returns true if the pool is at zero.
    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Returns true if the pool is at its maximum.
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }
}

impl fmt::Display for ResourcePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.max)
    }
}

/// The four pools of a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pools {
    /// Hit points.
    pub hp: ResourcePool,
    /// Composure.
    pub cmp: ResourcePool,
    /// Stamina.
    pub sp: ResourcePool,
    /// Focus.
    pub fp: ResourcePool,
}

impl Pools {
    /// Derive full pools from attributes.
    pub fn from_attributes(attributes: &Attributes) -> Self {
        Self {
            hp: ResourcePool::new(Pool::Hp.max_for(attributes)),
            cmp: ResourcePool::new(Pool::Cmp.max_for(attributes)),
            sp: ResourcePool::new(Pool::Sp.max_for(attributes)),
            fp: ResourcePool::new(Pool::Fp.max_for(attributes)),
        }
    }

    /// Shared access by pool kind.
    pub fn get(&self, pool: Pool) -> &ResourcePool {
        match pool {
            Pool::Hp => &self.hp,
            Pool::Cmp => &self.cmp,
            Pool::Sp => &self.sp,
            Pool::Fp => &self.fp,
        }
    }

    /// Mutable access by pool kind.
    pub fn get_mut(&mut self, pool: Pool) -> &mut ResourcePool {
        match pool {
            Pool::Hp => &mut self.hp,
            Pool::Cmp => &mut self.cmp,
            Pool::Sp => &mut self.sp,
            Pool::Fp => &mut self.fp,
        }
    }
}
