//! The roller abstraction and its seeded and scripted implementations.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::Die;

/// Source of die faces.
pub trait DiceRoller: std::fmt::Debug {
    /// Roll one die with `sides` faces, returning 1..=sides.
    fn roll_die(&mut self, sides: u32) -> u32;

    /// Roll a typed die.
    fn roll(&mut self, die: Die) -> u32 {
        self.roll_die(die.sides())
    }

    /// Roll a single d20.
    fn d20(&mut self) -> u32 {
        self.roll_die(20)
    }
}

/// Seeded RNG roller. The same seed yields the same sequence.
#[derive(Debug, Clone)]
pub struct SeededRoller {
    rng: StdRng,
}

impl SeededRoller {
    /// Create a roller from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DiceRoller for SeededRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        self.rng.random_range(1..=sides)
    }
}

/// Replays a fixed list of faces, for tests and recorded combats.
///
/// Each face is clamped to the die being rolled. Once the script runs out
/// every roll returns the die's midpoint, rounded up.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoller {
    faces: VecDeque<u32>,
}

impl ScriptedRoller {
    /// Create a roller that returns `faces` in order.
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
        }
    }

    /// Queue more faces.
    pub fn push(&mut self, face: u32) {
        self.faces.push_back(face);
    }

    /// Faces not yet consumed.
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceRoller for ScriptedRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        match self.faces.pop_front() {
            Some(face) => face.clamp(1, sides),
            None => sides.div_ceil(2),
        }
    }
}

/// Whether a d20 is rolled once or twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollMode {
    /// Keep the first die.
    #[default]
    Normal,
    /// Keep the higher of two dice.
    Advantage,
    /// Keep the lower of two dice.
    Disadvantage,
}

impl RollMode {
    /// Advantage and disadvantage cancel out.
    pub fn from_flags(advantage: bool, disadvantage: bool) -> Self {
        match (advantage, disadvantage) {
            (true, false) => Self::Advantage,
            (false, true) => Self::Disadvantage,
            _ => Self::Normal,
        }
    }

    /// Pick the kept face from a pair rolled up front.
    pub fn keep(self, first: u32, second: u32) -> u32 {
        match self {
            Self::Normal => first,
            Self::Advantage => first.max(second),
            Self::Disadvantage => first.min(second),
        }
    }
}

impl std::fmt::Display for RollMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Advantage => write!(f, "advantage"),
            Self::Disadvantage => write!(f, "disadvantage"),
        }
    }
}

/// A pair of d20s rolled before the mode is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Roll {
    /// First face.
    pub first: u32,
    /// Second face, used only under advantage or disadvantage.
    pub second: u32,
}

impl D20Roll {
    /// Roll both faces.
    pub fn roll(dice: &mut dyn DiceRoller) -> Self {
        let first = dice.d20();
        let second = dice.d20();
        Self { first, second }
    }

    /// The face kept under a mode.
    pub fn natural(self, mode: RollMode) -> u32 {
        mode.keep(self.first, self.second)
    }
}
