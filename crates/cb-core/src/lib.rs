//! Core combat data model for Clashbound.
//!
//! This crate defines the records the rule-resolution engine mutates:
//! combatants with their stats, resource pools and timed conditions, grid
//! positions, the terrain provider contract, and the battlefield that ties
//! a roster of combatants to a terrain. It contains no turn logic; the
//! combat engine in `cb-mechanics` drives everything here.

/// The battlefield: combatant roster, terrain, and occupancy queries.
pub mod battlefield;
/// Combatant records and their damage/heal/condition primitives.
pub mod combatant;
/// Error types used throughout the crate.
pub mod error;
/// Grid positions, facing, and the terrain provider contract.
pub mod grid;
/// Resource pools (HP, CMP, SP, FP) with clamped current/max values.
pub mod pool;
/// The twelve stats, their modifiers, and clash categories.
pub mod stat;
/// Timed effects and the condition set.
pub mod status;

/// Re-export of battlefield types.
pub use battlefield::Battlefield;
/// Re-export of combatant types.
pub use combatant::{Combatant, CombatantId, Team, TurnEconomy};
/// Re-export of error types.
pub use error::{CoreError, CoreResult};
/// Re-export of grid types.
pub use grid::{Facing, Hazard, Position, Terrain, Tile, TileGrid};
/// Re-export of pool types.
pub use pool::{Pool, Pools, ResourcePool};
/// Re-export of stat types.
pub use stat::{Attributes, Stat, StatCategory};
/// Re-export of status types.
pub use status::{EffectDuration, Expired, StatusSet, TimedEffect};
