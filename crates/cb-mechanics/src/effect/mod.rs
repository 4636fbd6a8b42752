//! Effect-text resolution: rules, handlers, and the per-action context.

pub mod catalog;
pub mod context;
pub mod handlers;
pub mod registry;
pub mod standard;

pub use catalog::{HandlerArgs, HandlerCatalog, HandlerFactory, RuleSpec};
pub use context::{HandlerFault, Hook, ResolutionContext, ResolutionSlots};
pub use registry::{EffectMatch, EffectRegistry, EffectRule, Handler, Matcher, handler};
pub use standard::standard_rules;
