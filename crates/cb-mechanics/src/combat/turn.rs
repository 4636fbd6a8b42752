//! Initiative order.

use cb_core::CombatantId;
use serde::{Deserialize, Serialize};

/// One slot in the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiative {
    /// Who acts.
    pub combatant: CombatantId,
    /// Initiative score; higher acts first.
    pub score: i32,
}

/// Turn order: sorted once at combat start, then appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrder {
    slots: Vec<Initiative>,
    index: usize,
}

impl TurnOrder {
    /// Sort by descending score. Equal scores keep their given order.
    pub fn new(mut slots: Vec<Initiative>) -> Self {
        slots.sort_by(|a, b| b.score.cmp(&a.score));
        Self { slots, index: 0 }
    }

    /// Whose slot is current.
    pub fn current(&self) -> Option<CombatantId> {
        self.slots.get(self.index).map(|s| s.combatant)
    }

    /// Move to the next slot. Returns true if the order wrapped into a
    /// new round.
    pub fn advance(&mut self) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        self.index += 1;
        if self.index >= self.slots.len() {
            self.index = 0;
            true
        } else {
            false
        }
    }

    /// Append a latecomer (a summon) at the end without re-sorting.
    pub fn push(&mut self, combatant: CombatantId, score: i32) {
        self.slots.push(Initiative { combatant, score });
    }

    /// Returns true if the combatant holds a slot.
    pub fn contains(&self, combatant: CombatantId) -> bool {
        self.slots.iter().any(|s| s.combatant == combatant)
    }

    /// Every slot in acting order.
    pub fn slots(&self) -> &[Initiative] {
        &self.slots
    }

    /// Combatant ids in acting order.
    pub fn ids(&self) -> Vec<CombatantId> {
        self.slots.iter().map(|s| s.combatant).collect()
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nobody is in the order.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
