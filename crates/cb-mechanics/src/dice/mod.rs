//! Dice: die types, dice expressions, and the roller abstraction.
//!
//! Every random number in the engine is drawn through a [`DiceRoller`],
//! so a fixed seed (or a scripted sequence) replays a whole combat.

pub mod expr;
pub mod roller;

pub use expr::{DiceExpr, DiceRoll};
pub use roller::{D20Roll, DiceRoller, RollMode, ScriptedRoller, SeededRoller};

use serde::{Deserialize, Serialize};

/// A polyhedral die type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Die {
    /// Four-sided die.
    D4,
    /// Six-sided die.
    D6,
    /// Eight-sided die.
    D8,
    /// Ten-sided die.
    D10,
    /// Twelve-sided die.
    D12,
    /// Twenty-sided die.
    D20,
    /// Percentile die (1-100).
    D100,
    /// A die with a custom number of sides.
    Custom(u32),
}

impl Die {
    /// Returns the number of sides on this die.
    pub fn sides(self) -> u32 {
        match self {
            Self::D4 => 4,
            Self::D6 => 6,
            Self::D8 => 8,
            Self::D10 => 10,
            Self::D12 => 12,
            Self::D20 => 20,
            Self::D100 => 100,
            Self::Custom(n) => n,
        }
    }

    /// The die with this many sides.
    pub fn with_sides(sides: u32) -> Self {
        match sides {
            4 => Self::D4,
            6 => Self::D6,
            8 => Self::D8,
            10 => Self::D10,
            12 => Self::D12,
            20 => Self::D20,
            100 => Self::D100,
            n => Self::Custom(n),
        }
    }

    /// Parse a die from a string like "d20", "d6", "d1".
    pub fn from_str_tag(s: &str) -> Option<Self> {
        let sides = s.trim().to_lowercase().strip_prefix('d')?.parse::<u32>().ok()?;
        (sides >= 1).then(|| Self::with_sides(sides))
    }
}

impl std::fmt::Display for Die {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.sides())
    }
}
