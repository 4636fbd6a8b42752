//! Rule tables as data.
//!
//! A [`RuleSpec`] names a pattern, its exclusions, the hooks it fires on,
//! and a handler by catalog key. The [`HandlerCatalog`] turns those keys
//! into live handlers, so new content is added by loading JSON rather
//! than by touching dispatch code.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::context::Hook;
use super::handlers::{damage, modifiers, movement, resource, status};
use super::registry::{EffectRegistry, EffectRule, Handler};
use crate::error::{MechError, MechResult};

/// String arguments handed to a handler factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerArgs(BTreeMap<String, String>);

impl HandlerArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// An argument, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// An argument that must be present.
    pub fn require(&self, key: &str) -> MechResult<&str> {
        self.get(key)
            .ok_or_else(|| MechError::InvalidArgs(format!("missing argument '{key}'")))
    }

    /// An argument parsed into `T`. Absent arguments are `None`.
    pub fn parse<T: FromStr>(&self, key: &str) -> MechResult<Option<T>> {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| MechError::InvalidArgs(format!("bad value '{raw}' for '{key}'")))
            })
            .transpose()
    }
}

/// One rule as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Rule name, used in logs.
    pub name: String,
    /// Trigger pattern (case-insensitive).
    pub pattern: String,
    /// Patterns that veto the trigger.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Hooks the rule fires on.
    pub hooks: Vec<Hook>,
    /// Catalog key of the handler.
    pub handler: String,
    /// Handler arguments.
    #[serde(default)]
    pub args: HandlerArgs,
}

impl RuleSpec {
    /// A spec with no exclusions or arguments.
    pub fn new(name: &str, pattern: impl Into<String>, hooks: &[Hook], handler: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.into(),
            excludes: Vec::new(),
            hooks: hooks.to_vec(),
            handler: handler.to_string(),
            args: HandlerArgs::new(),
        }
    }

    /// Add a vetoing pattern, builder style.
    pub fn excluding(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Add a handler argument, builder style.
    pub fn arg(mut self, key: &str, value: impl Into<String>) -> Self {
        self.args = self.args.with(key, value);
        self
    }
}

/// Builds a handler from its arguments.
pub type HandlerFactory = fn(&HandlerArgs) -> MechResult<Handler>;

/// Handler factories keyed by name.
#[derive(Debug, Clone, Default)]
pub struct HandlerCatalog {
    factories: BTreeMap<String, HandlerFactory>,
}

impl HandlerCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in handler.
    pub fn standard() -> Self {
        let entries: [(&str, HandlerFactory); 30] = [
            ("cost", resource::cost),
            ("heal", resource::heal),
            ("damage", damage::damage),
            ("composure_damage", damage::composure_damage),
            ("lifesteal", damage::lifesteal),
            ("reflect", damage::reflect),
            ("area", damage::area),
            ("chain", damage::chain),
            ("status", status::status),
            ("saving_throw", status::saving_throw),
            ("cure", status::cure),
            ("grant_resistance", status::grant_resistance),
            ("push", movement::push),
            ("pull", movement::pull),
            ("teleport", movement::teleport),
            ("ignite", movement::ignite),
            ("to_hit", modifiers::to_hit),
            ("advantage", modifiers::advantage),
            ("disadvantage", modifiers::disadvantage),
            ("defense_advantage", modifiers::defense_advantage),
            ("auto_hit", modifiers::auto_hit),
            ("crit_range", modifiers::crit_range),
            ("ignore_armor", modifiers::ignore_armor),
            ("ignore_resistance", modifiers::ignore_resistance),
            ("defense_bonus", modifiers::defense_bonus),
            ("resistance", modifiers::resistance),
            ("immunity", modifiers::immunity),
            ("vulnerability", modifiers::vulnerability),
            ("crit_immunity", modifiers::crit_immunity),
            ("damage_reduction", modifiers::damage_reduction),
        ];
        let mut catalog = Self::new();
        for (name, factory) in entries {
            catalog.insert(name, factory);
        }
        catalog
    }

    /// Add or replace a factory.
    pub fn insert(&mut self, name: &str, factory: HandlerFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Returns true if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered factory names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Compile a spec into a live rule.
    pub fn build(&self, spec: &RuleSpec) -> MechResult<EffectRule> {
        let factory = self
            .factories
            .get(&spec.handler)
            .ok_or_else(|| MechError::UnknownHandler(spec.handler.clone()))?;
        let handler = factory(&spec.args)?;
        EffectRule::new(spec.name.clone(), &spec.pattern, &spec.hooks, handler)?
            .excluding(&spec.excludes)
    }
}

impl EffectRegistry {
    /// Build a registry from specs, in order.
    pub fn from_specs(specs: &[RuleSpec], catalog: &HandlerCatalog) -> MechResult<Self> {
        let mut registry = Self::new();
        registry.extend_from_specs(specs, catalog)?;
        Ok(registry)
    }

    /// Append rules built from specs. Nothing is appended if any spec fails.
    pub fn extend_from_specs(&mut self, specs: &[RuleSpec], catalog: &HandlerCatalog) -> MechResult<()> {
        let rules = specs
            .iter()
            .map(|spec| catalog.build(spec))
            .collect::<MechResult<Vec<_>>>()?;
        for rule in rules {
            self.register(rule);
        }
        Ok(())
    }

    /// Append rules from a JSON array of specs.
    pub fn extend_from_json(&mut self, json: &str, catalog: &HandlerCatalog) -> MechResult<()> {
        let specs: Vec<RuleSpec> = serde_json::from_str(json)?;
        self.extend_from_specs(&specs, catalog)
    }
}
