//! Timed effects and the condition set.
//!
//! A condition is active iff the set holds an entry with that name. Entries
//! either count down whole rounds or are permanent until cleared, so the
//! "active-condition set" and the "timed-effect list" can never disagree.
//! Reapplying a condition extends it to the longer of the two durations;
//! duplicates are never stacked.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How long a timed effect lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectDuration {
    /// Whole rounds remaining.
    Rounds(u32),
    /// Never decrements; lasts until explicitly cleared.
    Permanent,
}

impl EffectDuration {
    /// The longer of two durations. Permanent outlasts everything.
    pub fn longest(self, other: Self) -> Self {
        match (self, other) {
            (Self::Permanent, _) | (_, Self::Permanent) => Self::Permanent,
            (Self::Rounds(a), Self::Rounds(b)) => Self::Rounds(a.max(b)),
        }
    }

    /// Rounds remaining, or `None` for permanent effects.
    pub fn rounds(self) -> Option<u32> {
        match self {
            Self::Rounds(n) => Some(n),
            Self::Permanent => None,
        }
    }
}

impl fmt::Display for EffectDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rounds(n) => write!(f, "{n} round(s)"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// A named condition with a remaining duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEffect {
    /// Condition name, e.g. "Stunned".
    pub name: String,
    /// Remaining duration.
    pub duration: EffectDuration,
    /// Boolean flag on the owner to clear when this effect expires.
    pub on_expire: Option<String>,
}

/// An effect that ran out during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expired {
    /// Condition name.
    pub name: String,
    /// Flag the owner should clear, if any.
    pub on_expire: Option<String>,
}

/// All timed effects owned by one combatant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSet {
    effects: Vec<TimedEffect>,
}

impl StatusSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a condition, extending (never shortening) an existing entry.
    ///
    /// Returns the duration the condition now has. Applying `Rounds(0)`
    /// to an absent condition is a no-op and returns `None`.
    pub fn apply(
        &mut self,
        name: &str,
        duration: EffectDuration,
        on_expire: Option<String>,
    ) -> Option<EffectDuration> {
        if let Some(existing) = self.find_mut(name) {
            existing.duration = existing.duration.longest(duration);
            if existing.on_expire.is_none() {
                existing.on_expire = on_expire;
            }
            return Some(existing.duration);
        }
        if duration == EffectDuration::Rounds(0) {
            return None;
        }
        self.effects.push(TimedEffect {
            name: name.to_string(),
            duration,
            on_expire,
        });
        Some(duration)
    }

    /// Returns true if a condition with this name is active (case-insensitive).
    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// The entry for a condition, if active.
    pub fn get(&self, name: &str) -> Option<&TimedEffect> {
        self.find(name)
    }

    /// Remaining duration of a condition, if active.
    pub fn remaining(&self, name: &str) -> Option<EffectDuration> {
        self.find(name).map(|e| e.duration)
    }

    /// Remove a condition regardless of its duration.
    pub fn remove(&mut self, name: &str) -> Option<TimedEffect> {
        let idx = self
            .effects
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))?;
        Some(self.effects.remove(idx))
    }

    /// Advance one round: decrement every timed entry and drop the ones
    /// that reach zero. Permanent entries are untouched.
    pub fn tick(&mut self) -> Vec<Expired> {
        let mut expired = Vec::new();
        self.effects.retain_mut(|effect| match effect.duration {
            EffectDuration::Permanent => true,
            EffectDuration::Rounds(n) => {
                let left = n.saturating_sub(1);
                effect.duration = EffectDuration::Rounds(left);
                if left == 0 {
                    expired.push(Expired {
                        name: effect.name.clone(),
                        on_expire: effect.on_expire.take(),
                    });
                    false
                } else {
                    true
                }
            }
        });
        expired
    }

    /// Names of all active conditions.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.effects.iter().map(|e| e.name.as_str())
    }

    /// All active entries.
    pub fn iter(&self) -> impl Iterator<Item = &TimedEffect> {
        self.effects.iter()
    }

    /// Number of active conditions.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Returns true if no condition is active.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    fn find(&self, name: &str) -> Option<&TimedEffect> {
        self.effects
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut TimedEffect> {
        self.effects
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }
}
