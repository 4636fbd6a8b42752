//! Engine tunables: tier thresholds, the crit threshold, tier damage dice
//! and clash tie handling.

use serde::{Deserialize, Serialize};

use crate::dice::{DiceExpr, Die};
use crate::error::MechResult;

/// How an exact tie in a clash contest is broken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClashTiePolicy {
    /// The combatant who started the clash wins ties.
    #[default]
    AttackerWins,
    /// Both sides reroll until someone wins.
    Reroll,
}

/// Margin bounds that split a positive margin into graze, hit and crit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginThresholds {
    /// Largest margin that is still a graze.
    pub graze_max: i32,
    /// Largest margin that is still a plain hit. Anything above is a crit.
    pub hit_max: i32,
}

impl Default for MarginThresholds {
    fn default() -> Self {
        Self {
            graze_max: 2,
            hit_max: 9,
        }
    }
}

/// Tunable constants for one combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RNG seed for deterministic replays.
    pub seed: u64,
    /// Outcome tier bounds.
    pub thresholds: MarginThresholds,
    /// Natural d20 face at or above which an attack crits.
    pub crit_threshold: u32,
    /// Rounds a status lasts when its text gives no duration.
    pub default_status_rounds: u32,
    /// DC used by saving-throw text that names none.
    pub default_save_dc: i32,
    /// Composure lost to a graze.
    pub graze_composure: i32,
    /// Flat damage of the Vitality clash consequence.
    pub clash_damage: i32,
    /// Clash tie-break rule.
    pub clash_tie: ClashTiePolicy,
    /// Extra applications allowed for reflect and chain effects.
    pub max_chain_depth: u8,
    /// Cells a combatant may move per turn.
    pub movement_cells: u32,
    /// Feet per grid cell for push, pull, teleport and area text.
    pub feet_per_cell: u32,
    /// Damage dice by ability tier, used when damage text names no dice.
    pub tier_damage: Vec<DiceExpr>,
    /// Damage of an attack with no damage text at all.
    pub unarmed_damage: DiceExpr,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            thresholds: MarginThresholds::default(),
            crit_threshold: 20,
            default_status_rounds: 1,
            default_save_dc: 12,
            graze_composure: 1,
            clash_damage: 2,
            clash_tie: ClashTiePolicy::default(),
            max_chain_depth: 1,
            movement_cells: 6,
            feet_per_cell: 5,
            tier_damage: vec![
                DiceExpr::new(1, Die::D4),
                DiceExpr::new(1, Die::D6),
                DiceExpr::new(2, Die::D6),
                DiceExpr::new(3, Die::D6),
                DiceExpr::new(4, Die::D6),
            ],
            unarmed_damage: DiceExpr::new(1, Die::D4),
        }
    }
}

impl EngineConfig {
    /// Load a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> MechResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the graze and hit margin bounds.
    pub fn with_thresholds(mut self, graze_max: i32, hit_max: i32) -> Self {
        self.thresholds = MarginThresholds { graze_max, hit_max };
        self
    }

    /// Set the natural crit face.
    pub fn with_crit_threshold(mut self, face: u32) -> Self {
        self.crit_threshold = face;
        self
    }

    /// Set the clash tie-break rule.
    pub fn with_clash_tie(mut self, policy: ClashTiePolicy) -> Self {
        self.clash_tie = policy;
        self
    }

    /// Set the default status duration.
    pub fn with_default_status_rounds(mut self, rounds: u32) -> Self {
        self.default_status_rounds = rounds;
        self
    }

    /// Set the per-turn movement allowance.
    pub fn with_movement(mut self, cells: u32) -> Self {
        self.movement_cells = cells;
        self
    }

    /// Convert a distance in feet to whole cells, at least one for any
    /// positive distance.
    pub fn feet_to_cells(&self, feet: u32) -> u32 {
        if feet == 0 {
            return 0;
        }
        (feet / self.feet_per_cell.max(1)).max(1)
    }

    /// Damage dice for an ability tier. Tier 0 and unknown tiers clamp to
    /// the ends of the table.
    pub fn damage_for_tier(&self, tier: u32) -> DiceExpr {
        let idx = (tier.max(1) as usize - 1).min(self.tier_damage.len().saturating_sub(1));
        self.tier_damage
            .get(idx)
            .copied()
            .unwrap_or(self.unarmed_damage)
    }
}
