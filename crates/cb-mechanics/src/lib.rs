//! Rule-resolution engine for Clashbound.
//!
//! Effect text is matched against an ordered registry of regex rules whose
//! handlers fill a per-action resolution context. The combat engine drives
//! the attack state machine (roll, hooks, Miss/Graze/Hit/Crit/Clash), stat
//! contests for clashes, timed statuses, turn order, movement, and the
//! single action funnel shared by AI and player input.

pub mod combat;
pub mod config;
pub mod dice;
pub mod effect;
pub mod error;
pub mod sources;

pub use combat::{
    ActionOutcome, Activation, AttackRequest, AttackTier, ClashTable, CombatAction, CombatEngine,
    CombatEvent, CombatState,
};
pub use config::{ClashTiePolicy, EngineConfig, MarginThresholds};
pub use dice::{DiceExpr, DiceRoller, RollMode, ScriptedRoller, SeededRoller};
pub use effect::{EffectRegistry, EffectRule, HandlerCatalog, Hook, ResolutionContext, RuleSpec};
pub use error::{MechError, MechResult};
pub use sources::{EffectAggregator, EffectSource, StaticSources};
