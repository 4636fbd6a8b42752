//! Outcome tiers of an opposed attack.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MarginThresholds;

/// How an attack landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackTier {
    /// Negative margin. No effect.
    Miss,
    /// Small positive margin. Composure chip only.
    Graze,
    /// Full damage and on-hit effects.
    Hit,
    /// Double damage plus an injury roll.
    Crit,
    /// Exact tie. Routes to the clash contest.
    Clash,
}

impl AttackTier {
    /// Returns true if the tier applies on-hit effects.
    pub fn lands(self) -> bool {
        matches!(self, Self::Hit | Self::Crit)
    }
}

impl fmt::Display for AttackTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Miss => write!(f, "Miss"),
            Self::Graze => write!(f, "Graze"),
            Self::Hit => write!(f, "Hit"),
            Self::Crit => write!(f, "Crit"),
            Self::Clash => write!(f, "Clash"),
        }
    }
}

/// Classify a margin. Pure: the same inputs always give the same tier.
///
/// A natural face at or above `crit_threshold` crits whatever the margin,
/// except on an exact tie, which always clashes.
pub fn classify(margin: i32, natural: u32, crit_threshold: u32, thresholds: MarginThresholds) -> AttackTier {
    if margin == 0 {
        AttackTier::Clash
    } else if natural >= crit_threshold || margin > thresholds.hit_max {
        AttackTier::Crit
    } else if margin < 0 {
        AttackTier::Miss
    } else if margin <= thresholds.graze_max {
        AttackTier::Graze
    } else {
        AttackTier::Hit
    }
}

/// Margin after auto-hit is applied. Auto-hit lifts the margin to at
/// least 1, so an auto-hit attack never clashes.
pub fn effective_margin(raw: i32, auto_hit: bool) -> i32 {
    if auto_hit { raw.max(1) } else { raw }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: MarginThresholds = MarginThresholds {
        graze_max: 2,
        hit_max: 9,
    };

    #[test]
    fn tier_boundaries() {
        assert_eq!(classify(-1, 10, 20, T), AttackTier::Miss);
        assert_eq!(classify(0, 10, 20, T), AttackTier::Clash);
        assert_eq!(classify(1, 10, 20, T), AttackTier::Graze);
        assert_eq!(classify(2, 10, 20, T), AttackTier::Graze);
        assert_eq!(classify(3, 10, 20, T), AttackTier::Hit);
        assert_eq!(classify(9, 10, 20, T), AttackTier::Hit);
        assert_eq!(classify(10, 10, 20, T), AttackTier::Crit);
    }

    #[test]
    fn natural_crit_ignores_the_margin_but_not_a_tie() {
        assert_eq!(classify(1, 20, 20, T), AttackTier::Crit);
        assert_eq!(classify(4, 18, 18, T), AttackTier::Crit);
        assert_eq!(classify(-3, 20, 20, T), AttackTier::Crit);
        assert_eq!(classify(-3, 19, 20, T), AttackTier::Miss);
        assert_eq!(classify(0, 20, 20, T), AttackTier::Clash);
    }

    #[test]
    fn auto_hit_never_clashes() {
        assert_eq!(effective_margin(0, true), 1);
        assert_eq!(effective_margin(-7, true), 1);
        assert_eq!(effective_margin(5, true), 5);
        assert_eq!(effective_margin(0, false), 0);
        assert_ne!(classify(effective_margin(0, true), 10, 20, T), AttackTier::Clash);
    }

    #[test]
    fn only_hits_and_crits_land() {
        assert!(AttackTier::Hit.lands());
        assert!(AttackTier::Crit.lands());
        assert!(!AttackTier::Graze.lands());
        assert!(!AttackTier::Clash.lands());
        assert_eq!(AttackTier::Graze.to_string(), "Graze");
    }

    proptest! {
        #[test]
        fn classification_is_a_pure_function_of_margin(
            margin in -40i32..40,
            natural in 1u32..=20,
            threshold in 2u32..=20,
        ) {
            let a = classify(margin, natural, threshold, T);
            let b = classify(margin, natural, threshold, T);
            prop_assert_eq!(a, b);
            prop_assert_eq!(a == AttackTier::Clash, margin == 0);
            prop_assert_eq!(a == AttackTier::Miss, margin < 0 && natural < threshold);
        }
    }
}
