use crate::combatant::CombatantId;
use crate::grid::Position;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when manipulating the battlefield.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested combatant is not on the battlefield.
    #[error("combatant not found: {0}")]
    CombatantNotFound(CombatantId),

    /// A combatant with the same id is already on the battlefield.
    #[error("combatant already present: {0}")]
    DuplicateCombatant(CombatantId),

    /// The cell is already held by a living combatant.
    #[error("cell {0} is occupied")]
    CellOccupied(Position),

    /// The cell is outside the grid or is a wall.
    #[error("cell {0} is not walkable")]
    NotWalkable(Position),

    /// A stat name could not be parsed.
    #[error("unknown stat: {0}")]
    UnknownStat(String),

    /// A pool name could not be parsed.
    #[error("unknown pool: {0}")]
    UnknownPool(String),
}
