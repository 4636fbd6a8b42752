//! The battlefield: a roster of combatants on a terrain.
//!
//! Occupancy is derived from living combatants' positions; at most one
//! living combatant holds a cell. Dying combatants stay in the roster
//! (they may be revived) but no longer block their cell.

use std::collections::BTreeSet;

use crate::combatant::{Combatant, CombatantId, Team};
use crate::error::{CoreError, CoreResult};
use crate::grid::{Position, Terrain};

/// Combatants plus the terrain they stand on.
#[derive(Debug)]
pub struct Battlefield {
    combatants: Vec<Combatant>,
    terrain: Box<dyn Terrain>,
}

impl Battlefield {
    /// Create an empty battlefield over a terrain provider.
    pub fn new(terrain: impl Terrain + 'static) -> Self {
        Self {
            combatants: Vec::new(),
            terrain: Box::new(terrain),
        }
    }

    /// Add a combatant at its current position.
    pub fn add(&mut self, combatant: Combatant) -> CoreResult<CombatantId> {
        if self.get(combatant.id).is_some() {
            return Err(CoreError::DuplicateCombatant(combatant.id));
        }
        if !self.terrain.is_walkable(combatant.position) {
            return Err(CoreError::NotWalkable(combatant.position));
        }
        if combatant.is_alive() && self.occupant(combatant.position).is_some() {
            return Err(CoreError::CellOccupied(combatant.position));
        }
        let id = combatant.id;
        tracing::debug!(combatant = %combatant.name, id = %id, position = %combatant.position, "combatant entered");
        self.combatants.push(combatant);
        Ok(id)
    }

    /// Remove a combatant entirely (despawn).
    pub fn remove(&mut self, id: CombatantId) -> CoreResult<Combatant> {
        let idx = self
            .combatants
            .iter()
            .position(|c| c.id == id)
            .ok_or(CoreError::CombatantNotFound(id))?;
        Ok(self.combatants.remove(idx))
    }

    /// Look up a combatant.
    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    /// Look up a combatant mutably.
    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    /// Look up a combatant, failing if absent.
    pub fn require(&self, id: CombatantId) -> CoreResult<&Combatant> {
        self.get(id).ok_or(CoreError::CombatantNotFound(id))
    }

    /// Look up a combatant mutably, failing if absent.
    pub fn require_mut(&mut self, id: CombatantId) -> CoreResult<&mut Combatant> {
        self.get_mut(id).ok_or(CoreError::CombatantNotFound(id))
    }

    /// Mutable access to two distinct combatants at once.
    pub fn pair_mut(
        &mut self,
        a: CombatantId,
        b: CombatantId,
    ) -> Option<(&mut Combatant, &mut Combatant)> {
        if a == b {
            return None;
        }
        let ia = self.combatants.iter().position(|c| c.id == a)?;
        let ib = self.combatants.iter().position(|c| c.id == b)?;
        if ia < ib {
            let (left, right) = self.combatants.split_at_mut(ib);
            Some((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.combatants.split_at_mut(ia);
            Some((&mut right[0], &mut left[ib]))
        }
    }

    /// Every combatant in insertion order.
    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter()
    }

    /// Every combatant with HP above zero.
    pub fn living(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter().filter(|c| c.is_alive())
    }

    /// Number of combatants, living or not.
    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    /// Returns true if the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// The living combatant holding a cell.
    pub fn occupant(&self, pos: Position) -> Option<CombatantId> {
        self.living().find(|c| c.position == pos).map(|c| c.id)
    }

    /// Walkable and unoccupied.
    pub fn is_free(&self, pos: Position) -> bool {
        self.terrain.is_walkable(pos) && self.occupant(pos).is_none()
    }

    /// Move a combatant to a free cell.
    pub fn place(&mut self, id: CombatantId, pos: Position) -> CoreResult<()> {
        if !self.terrain.is_walkable(pos) {
            return Err(CoreError::NotWalkable(pos));
        }
        match self.occupant(pos) {
            Some(other) if other != id => return Err(CoreError::CellOccupied(pos)),
            _ => {}
        }
        self.require_mut(id)?.position = pos;
        Ok(())
    }

    /// Exchange the cells of two combatants.
    pub fn swap(&mut self, a: CombatantId, b: CombatantId) -> CoreResult<()> {
        let (ca, cb) = self
            .pair_mut(a, b)
            .ok_or(CoreError::CombatantNotFound(b))?;
        std::mem::swap(&mut ca.position, &mut cb.position);
        Ok(())
    }

    /// The free cell closest to `origin`, searching out to `radius` cells.
    /// Ties go to the first cell in row-major order.
    pub fn nearest_free(&self, origin: Position, radius: u32) -> Option<Position> {
        if self.is_free(origin) {
            return Some(origin);
        }
        let r = radius as i32;
        (1..=r).find_map(|ring| {
            (-ring..=ring)
                .flat_map(|dy| (-ring..=ring).map(move |dx| origin.offset(dx, dy)))
                .filter(|cell| origin.distance(*cell) == ring as u32)
                .find(|cell| self.is_free(*cell))
        })
    }

    /// Living allies of a combatant (same team, excluding itself).
    pub fn allies_of(&self, id: CombatantId) -> Vec<&Combatant> {
        let Some(me) = self.get(id) else {
            return Vec::new();
        };
        self.living()
            .filter(|c| c.id != id && c.team == me.team)
            .collect()
    }

    /// Living enemies of a combatant (any other team).
    pub fn enemies_of(&self, id: CombatantId) -> Vec<&Combatant> {
        let Some(me) = self.get(id) else {
            return Vec::new();
        };
        self.living().filter(|c| c.team != me.team).collect()
    }

    /// Teams that still have a living member.
    pub fn teams_standing(&self) -> BTreeSet<Team> {
        self.living().map(|c| c.team.clone()).collect()
    }

    /// The terrain provider.
    pub fn terrain(&self) -> &dyn Terrain {
        self.terrain.as_ref()
    }

    /// The terrain provider, mutably.
    pub fn terrain_mut(&mut self) -> &mut dyn Terrain {
        self.terrain.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileGrid;
    use crate::stat::Attributes;

    fn field() -> Battlefield {
        Battlefield::new(TileGrid::new(6, 6))
    }

    #[test]
    fn add_rejects_occupied_and_walls() {
        let mut bf = field();
        bf.add(Combatant::new("A", Attributes::new()).at(1, 1))
            .unwrap();
        let err = bf
            .add(Combatant::new("B", Attributes::new()).at(1, 1))
            .unwrap_err();
        assert!(matches!(err, CoreError::CellOccupied(_)));

        bf.terrain_mut().set_blocked(Position::new(2, 2), true);
        let err = bf
            .add(Combatant::new("C", Attributes::new()).at(2, 2))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotWalkable(_)));
    }

    #[test]
    fn nearest_free_walks_outward() {
        let mut bf = field();
        bf.add(Combatant::new("A", Attributes::new()).at(0, 0))
            .unwrap();
        bf.terrain_mut().set_blocked(Position::new(1, 0), true);
        assert_eq!(bf.nearest_free(Position::new(3, 3), 2), Some(Position::new(3, 3)));
        assert_eq!(bf.nearest_free(Position::new(0, 0), 2), Some(Position::new(0, 1)));
        assert_eq!(bf.nearest_free(Position::new(0, 0), 0), None);
    }

    #[test]
    fn dying_combatant_frees_its_cell() {
        let mut bf = field();
        let a = bf
            .add(Combatant::new("A", Attributes::new()).at(0, 0))
            .unwrap();
        assert!(!bf.is_free(Position::new(0, 0)));
        bf.require_mut(a).unwrap().take_damage(999);
        assert!(bf.is_free(Position::new(0, 0)));
    }

    #[test]
    fn place_and_swap() {
        let mut bf = field();
        let a = bf
            .add(Combatant::new("A", Attributes::new()).at(0, 0))
            .unwrap();
        let b = bf
            .add(Combatant::new("B", Attributes::new()).at(1, 0))
            .unwrap();
        assert!(bf.place(a, Position::new(1, 0)).is_err());
        bf.place(a, Position::new(0, 1)).unwrap();
        bf.swap(a, b).unwrap();
        assert_eq!(bf.get(a).unwrap().position, Position::new(1, 0));
        assert_eq!(bf.get(b).unwrap().position, Position::new(0, 1));
    }

    #[test]
    fn allies_and_enemies() {
        let mut bf = field();
        let a = bf
            .add(Combatant::new("A", Attributes::new()).with_team("red").at(0, 0))
            .unwrap();
        bf.add(Combatant::new("B", Attributes::new()).with_team("red").at(1, 0))
            .unwrap();
        bf.add(Combatant::new("C", Attributes::new()).with_team("blue").at(2, 0))
            .unwrap();
        assert_eq!(bf.allies_of(a).len(), 1);
        assert_eq!(bf.enemies_of(a).len(), 1);
        assert_eq!(bf.teams_standing().len(), 2);
    }

    #[test]
    fn pair_mut_both_orders() {
        let mut bf = field();
        let a = bf
            .add(Combatant::new("A", Attributes::new()).at(0, 0))
            .unwrap();
        let b = bf
            .add(Combatant::new("B", Attributes::new()).at(1, 0))
            .unwrap();
        let (x, y) = bf.pair_mut(b, a).unwrap();
        assert_eq!(x.name, "B");
        assert_eq!(y.name, "A");
        assert!(bf.pair_mut(a, a).is_none());
    }
}
