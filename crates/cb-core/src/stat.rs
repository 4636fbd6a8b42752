use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Score assumed for a stat that was never set.
pub const BASELINE_SCORE: i32 = 10;

/// One of the twelve named stats every combatant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    /// Raw physical strength.
    Might,
    /// Staying power under exertion.
    Endurance,
    /// Precision and fine control.
    Finesse,
    /// Speed of reaction.
    Reflexes,
    /// Physical toughness and life force.
    Vitality,
    /// Resistance to pain and poison.
    Fortitude,
    /// Learned lore.
    Knowledge,
    /// Reasoning.
    Logic,
    /// Perception of the surroundings.
    Awareness,
    /// Reading people and situations.
    Intuition,
    /// Force of personality.
    Charm,
    /// Mental resolve.
    Willpower,
}

/// The family a stat belongs to when it wins a clash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatCategory {
    /// Physical power: shoves the loser back.
    Power,
    /// Agility: trades places with the loser.
    Agility,
    /// Social or insight: outmaneuvers the loser to a flanking cell.
    Insight,
    /// Raw vitality: a small direct secondary-resource hit.
    Vitality,
    /// Willpower: slips directly behind the loser.
    Will,
}

impl Stat {
    /// All stats in canonical order.
    pub const ALL: [Stat; 12] = [
        Stat::Might,
        Stat::Endurance,
        Stat::Finesse,
        Stat::Reflexes,
        Stat::Vitality,
        Stat::Fortitude,
        Stat::Knowledge,
        Stat::Logic,
        Stat::Awareness,
        Stat::Intuition,
        Stat::Charm,
        Stat::Willpower,
    ];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Might => "Might",
            Self::Endurance => "Endurance",
            Self::Finesse => "Finesse",
            Self::Reflexes => "Reflexes",
            Self::Vitality => "Vitality",
            Self::Fortitude => "Fortitude",
            Self::Knowledge => "Knowledge",
            Self::Logic => "Logic",
            Self::Awareness => "Awareness",
            Self::Intuition => "Intuition",
            Self::Charm => "Charm",
            Self::Willpower => "Willpower",
        }
    }

    /// Three-letter abbreviation.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Might => "MIG",
            Self::Endurance => "END",
            Self::Finesse => "FIN",
            Self::Reflexes => "REF",
            Self::Vitality => "VIT",
            Self::Fortitude => "FOR",
            Self::Knowledge => "KNO",
            Self::Logic => "LOG",
            Self::Awareness => "AWA",
            Self::Intuition => "INT",
            Self::Charm => "CHA",
            Self::Willpower => "WIL",
        }
    }

    /// The clash category of this stat.
    pub fn category(self) -> StatCategory {
        match self {
            Self::Might | Self::Endurance => StatCategory::Power,
            Self::Finesse | Self::Reflexes => StatCategory::Agility,
            Self::Knowledge | Self::Logic | Self::Awareness | Self::Intuition | Self::Charm => {
                StatCategory::Insight
            }
            Self::Vitality | Self::Fortitude => StatCategory::Vitality,
            Self::Willpower => StatCategory::Will,
        }
    }

    /// Parse a stat from its name or abbreviation, ignoring case.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|stat| {
                stat.name().eq_ignore_ascii_case(s) || stat.abbreviation().eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| CoreError::UnknownStat(s.to_string()))
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Ability-score modifier: `(score - 10) div 2`, rounding toward negative infinity.
pub fn modifier(score: i32) -> i32 {
    (score - BASELINE_SCORE).div_euclid(2)
}

/// A combatant's stat scores. Stats that were never set read as the baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    scores: BTreeMap<Stat, i32>,
}

impl Attributes {
    /// Create attributes with every stat at the baseline score.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a score, builder style.
    pub fn with(mut self, stat: Stat, score: i32) -> Self {
        self.set(stat, score);
        self
    }

    /// Set a score.
    pub fn set(&mut self, stat: Stat, score: i32) {
        self.scores.insert(stat, score);
    }

    /// The raw score for a stat.
    pub fn score(&self, stat: Stat) -> i32 {
        self.scores.get(&stat).copied().unwrap_or(BASELINE_SCORE)
    }

    /// The modifier for a stat.
    pub fn modifier(&self, stat: Stat) -> i32 {
        modifier(self.score(stat))
    }

    /// Sum of the raw scores of several stats.
    pub fn sum(&self, stats: &[Stat]) -> i32 {
        stats.iter().map(|s| self.score(*s)).sum()
    }
}
