//! Error types for the rule-resolution engine.

use cb_core::{CoreError, Position};

/// Errors that can occur during effect resolution or combat.
#[derive(Debug, thiserror::Error)]
pub enum MechError {
    /// A battlefield operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Combat has not been started.
    #[error("combat has not started")]
    NotStarted,

    /// `start` was called twice.
    #[error("combat has already started")]
    AlreadyStarted,

    /// There is nobody to fight.
    #[error("no combatants on the battlefield")]
    NoCombatants,

    /// Combat has already ended.
    #[error("combat is over")]
    CombatOver,

    /// A clash must be resolved before anything else happens.
    #[error("a clash is pending")]
    ClashPending,

    /// `resolve_clash` was called with no clash pending.
    #[error("no clash is pending")]
    NoClashPending,

    /// The actor is not the combatant whose turn it is.
    #[error("it is not {0}'s turn")]
    NotYourTurn(String),

    /// The actor already spent their action this turn.
    #[error("{0} has already acted this turn")]
    ActionUsed(String),

    /// The actor already moved this turn.
    #[error("{0} has already moved this turn")]
    AlreadyMoved(String),

    /// The actor cannot act (stunned, paralyzed, or down).
    #[error("{0} cannot act")]
    Incapacitated(String),

    /// A move was rejected.
    #[error("cannot move to {to}: {reason}")]
    IllegalMove {
        /// Requested destination.
        to: Position,
        /// Why the move is illegal.
        reason: String,
    },

    /// The target of an action is not valid.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// A handler needed a target but the context has none.
    #[error("effect needs a target")]
    MissingTarget,

    /// A handler could not read a capture group it expected.
    #[error("rule '{rule}' has no usable capture '{group}'")]
    MalformedCapture {
        /// Rule name.
        rule: String,
        /// Capture group name or index.
        group: String,
    },

    /// A dice expression could not be parsed.
    #[error("invalid dice expression: {0}")]
    InvalidDice(String),

    /// A rule pattern failed to compile.
    #[error("invalid rule pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A rule table referenced a handler the catalog does not know.
    #[error("unknown handler: {0}")]
    UnknownHandler(String),

    /// A handler factory was given bad arguments.
    #[error("invalid handler arguments: {0}")]
    InvalidArgs(String),

    /// Configuration could not be loaded.
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Convenience result type for mechanics operations.
pub type MechResult<T> = Result<T, MechError>;
