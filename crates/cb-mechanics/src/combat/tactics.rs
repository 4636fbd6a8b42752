//! Positional and condition modifiers evaluated before an attack roll.

use cb_core::{Battlefield, Combatant};
use serde::{Deserialize, Serialize};

use crate::dice::RollMode;

/// Defender conditions that give the attacker advantage.
const EXPOSED: [&str; 4] = ["Prone", "Stunned", "Restrained", "Paralyzed"];
/// Attacker conditions that give the attacker disadvantage.
const HAMPERED: [&str; 3] = ["Prone", "Blinded", "Frightened"];
/// Adjacent allies needed to flank.
pub const FLANKING_ALLIES: usize = 2;

/// Why an attack gets advantage or disadvantage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tactics {
    /// Reasons for advantage, in evaluation order.
    pub advantages: Vec<String>,
    /// Reasons for disadvantage, in evaluation order.
    pub disadvantages: Vec<String>,
}

impl Tactics {
    /// Evaluate every tactical modifier for `attacker` striking `target`.
    pub fn assess(field: &Battlefield, attacker: &Combatant, target: &Combatant) -> Self {
        let mut tactics = Self::default();

        if attacker.elevation > target.elevation {
            tactics.advantages.push("high ground".into());
        } else if attacker.elevation < target.elevation {
            tactics.disadvantages.push("low ground".into());
        }

        if target.facing.is_behind(target.position, attacker.position) {
            tactics.advantages.push("rear attack".into());
        }

        let flankers = field
            .allies_of(attacker.id)
            .into_iter()
            .filter(|ally| ally.id != target.id && ally.position.is_adjacent(target.position))
            .count();
        if flankers >= FLANKING_ALLIES {
            tactics.advantages.push("flanking".into());
        }

        if field.terrain().is_cover(target.position) {
            tactics.disadvantages.push("cover".into());
        }

        if attacker.has_condition("Hidden") {
            tactics.advantages.push("hidden".into());
        }

        for condition in EXPOSED {
            if target.has_condition(condition) {
                tactics.advantages.push(format!("target {}", condition.to_lowercase()));
            }
        }
        for condition in HAMPERED {
            if attacker.has_condition(condition) {
                tactics.disadvantages.push(condition.to_lowercase());
            }
        }

        tactics
    }

    /// At least one advantage applies.
    pub fn has_advantage(&self) -> bool {
        !self.advantages.is_empty()
    }

    /// At least one disadvantage applies.
    pub fn has_disadvantage(&self) -> bool {
        !self.disadvantages.is_empty()
    }

    /// The roll mode before any effect text runs.
    pub fn mode(&self) -> RollMode {
        RollMode::from_flags(self.has_advantage(), self.has_disadvantage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::{Attributes, EffectDuration, Facing, Position, Terrain, Tile, TileGrid};

    fn fighter(name: &str, team: &str, x: i32, y: i32) -> Combatant {
        Combatant::new(name, Attributes::new()).with_team(team).at(x, y)
    }

    #[test]
    fn plain_attack_is_normal() {
        let mut field = Battlefield::new(TileGrid::new(5, 5));
        let a = field.add(fighter("A", "red", 1, 1)).unwrap();
        let d = field.add(fighter("D", "blue", 1, 0).facing(Facing::South)).unwrap();
        let tactics = Tactics::assess(&field, field.get(a).unwrap(), field.get(d).unwrap());
        assert_eq!(tactics.mode(), RollMode::Normal);
        assert!(tactics.advantages.is_empty());
    }

    #[test]
    fn rear_attack_and_high_ground() {
        let mut field = Battlefield::new(TileGrid::new(5, 5));
        let a = field.add(fighter("A", "red", 2, 3).with_elevation(2)).unwrap();
        // Faces north; the attacker stands south of it.
        let d = field.add(fighter("D", "blue", 2, 2).facing(Facing::North)).unwrap();
        let tactics = Tactics::assess(&field, field.get(a).unwrap(), field.get(d).unwrap());
        assert_eq!(tactics.advantages, vec!["high ground", "rear attack"]);
        assert_eq!(tactics.mode(), RollMode::Advantage);
    }

    #[test]
    fn flanking_needs_two_other_allies() {
        let mut field = Battlefield::new(TileGrid::new(5, 5));
        let d = field.add(fighter("D", "blue", 2, 2).facing(Facing::West)).unwrap();
        let a = field.add(fighter("A", "red", 1, 2)).unwrap();
        field.add(fighter("B", "red", 2, 1)).unwrap();
        let alone = Tactics::assess(&field, field.get(a).unwrap(), field.get(d).unwrap());
        assert!(!alone.advantages.contains(&"flanking".to_string()));

        field.add(fighter("C", "red", 2, 3)).unwrap();
        let flanked = Tactics::assess(&field, field.get(a).unwrap(), field.get(d).unwrap());
        assert!(flanked.advantages.contains(&"flanking".to_string()));
    }

    #[test]
    fn cover_and_conditions_cancel_out() {
        let mut grid = TileGrid::new(5, 5);
        grid.set_tile(Position::new(2, 2), Tile::Cover);
        assert!(grid.is_cover(Position::new(2, 2)));
        let mut field = Battlefield::new(grid);
        let a = field.add(fighter("A", "red", 1, 2)).unwrap();
        let d = field.add(fighter("D", "blue", 2, 2).facing(Facing::West)).unwrap();
        let tactics = Tactics::assess(&field, field.get(a).unwrap(), field.get(d).unwrap());
        assert_eq!(tactics.mode(), RollMode::Disadvantage);

        field
            .get_mut(d)
            .unwrap()
            .add_condition("Prone", EffectDuration::Rounds(1), None);
        let tactics = Tactics::assess(&field, field.get(a).unwrap(), field.get(d).unwrap());
        assert_eq!(tactics.advantages, vec!["target prone"]);
        assert_eq!(tactics.mode(), RollMode::Normal);
    }

    #[test]
    fn hampered_attacker() {
        let mut field = Battlefield::new(TileGrid::new(5, 5));
        let a = field.add(fighter("A", "red", 1, 2)).unwrap();
        let d = field.add(fighter("D", "blue", 2, 2).facing(Facing::West)).unwrap();
        field
            .get_mut(a)
            .unwrap()
            .add_condition("Blinded", EffectDuration::Rounds(1), None);
        let tactics = Tactics::assess(&field, field.get(a).unwrap(), field.get(d).unwrap());
        assert_eq!(tactics.disadvantages, vec!["blinded"]);
    }
}
