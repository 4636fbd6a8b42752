//! Dice expressions such as `2d6+3`, `d8` or a flat `4`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{DiceRoller, Die};
use crate::error::{MechError, MechResult};

const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 1000;

/// `count` dice of `die`, plus a flat bonus. A count of zero is a flat value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceExpr {
    /// Number of dice rolled.
    pub count: u32,
    /// Die type.
    pub die: Die,
    /// Flat modifier added to the sum.
    pub bonus: i32,
}

impl DiceExpr {
    /// `count` dice with no bonus.
    pub fn new(count: u32, die: Die) -> Self {
        Self {
            count,
            die,
            bonus: 0,
        }
    }

    /// A flat amount with no dice.
    pub fn flat(value: i32) -> Self {
        Self {
            count: 0,
            die: Die::D6,
            bonus: value,
        }
    }

    /// Add a flat bonus, builder style.
    pub fn plus(mut self, bonus: i32) -> Self {
        self.bonus = self.bonus.saturating_add(bonus);
        self
    }

    /// Parse `NdS`, `dS`, `NdS+B`, `NdS-B` or a bare integer.
    pub fn parse(text: &str) -> MechResult<Self> {
        let compact: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let bad = || MechError::InvalidDice(text.to_string());

        let Some((count_part, rest)) = compact.split_once('d') else {
            let value = compact.parse::<i32>().map_err(|_| bad())?;
            return Ok(Self::flat(value));
        };

        let count = if count_part.is_empty() {
            1
        } else {
            count_part.parse::<u32>().map_err(|_| bad())?
        };
        if count > MAX_DICE {
            return Err(bad());
        }

        let split_at = rest.find(['+', '-']).unwrap_or(rest.len());
        let (sides_part, bonus_part) = rest.split_at(split_at);
        let sides = sides_part.parse::<u32>().map_err(|_| bad())?;
        if sides == 0 || sides > MAX_SIDES {
            return Err(bad());
        }
        let bonus = if bonus_part.is_empty() {
            0
        } else {
            bonus_part.parse::<i32>().map_err(|_| bad())?
        };

        Ok(Self {
            count,
            die: Die::with_sides(sides),
            bonus,
        })
    }

    /// Roll every die and add the bonus.
    pub fn roll(&self, dice: &mut dyn DiceRoller) -> DiceRoll {
        let faces = (0..self.count).map(|_| dice.roll(self.die)).collect();
        DiceRoll {
            expr: *self,
            faces,
        }
    }

    /// Smallest possible total.
    pub fn min(&self) -> i32 {
        clamp_total(i64::from(self.count) + i64::from(self.bonus))
    }

    /// Largest possible total.
    pub fn max(&self) -> i32 {
        clamp_total(i64::from(self.count) * i64::from(self.die.sides()) + i64::from(self.bonus))
    }
}

impl FromStr for DiceExpr {
    type Err = MechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DiceExpr {
    type Error = MechError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DiceExpr> for String {
    fn from(value: DiceExpr) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "{}", self.bonus);
        }
        write!(f, "{}{}", self.count, self.die)?;
        match self.bonus {
            0 => Ok(()),
            b if b > 0 => write!(f, "+{b}"),
            b => write!(f, "{b}"),
        }
    }
}

/// The faces of one expression roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// What was rolled.
    pub expr: DiceExpr,
    /// Each die's face.
    pub faces: Vec<u32>,
}

impl DiceRoll {
    /// Sum of faces plus bonus, never below zero.
    pub fn total(&self) -> i32 {
        let sum: i64 = self.faces.iter().map(|&f| i64::from(f)).sum();
        clamp_total(sum + i64::from(self.expr.bonus)).max(0)
    }
}

fn clamp_total(total: i64) -> i32 {
    total.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.faces.iter().map(|v| v.to_string()).collect();
        write!(f, "{} [{}] = {}", self.expr, values.join(", "), self.total())
    }
}
