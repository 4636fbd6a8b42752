//! Effect sources: where a combatant's effect texts come from.
//!
//! Traits, trained skills and powers live in storage the engine does not
//! own. An [`EffectSource`] yields the texts for a combatant; the
//! [`EffectAggregator`] collects them and feeds each one through the
//! registry for a given hook.

use std::collections::HashMap;
use std::fmt;

use cb_core::CombatantId;
use serde::{Deserialize, Serialize};

use crate::effect::{EffectRegistry, Hook, ResolutionContext};

/// Where an effect text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Innate trait.
    Trait,
    /// Trained skill.
    Skill,
    /// Learned power or ability.
    Power,
    /// Equipped item.
    Item,
}

/// One effect text and its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Origin.
    pub kind: SourceKind,
    /// Display name of the trait, skill, power or item.
    pub name: String,
    /// The effect text.
    pub text: String,
}

/// Yields effect texts for a combatant.
pub trait EffectSource: fmt::Debug {
    /// Every text attached to the combatant. Order is preserved.
    fn effect_texts(&self, combatant: CombatantId) -> Vec<String>;
}

/// In-memory source keyed by combatant id.
#[derive(Debug, Clone, Default)]
pub struct StaticSources {
    entries: HashMap<CombatantId, Vec<SourceEntry>>,
}

impl StaticSources {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a text.
    pub fn add(
        &mut self,
        combatant: CombatantId,
        kind: SourceKind,
        name: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.entries.entry(combatant).or_default().push(SourceEntry {
            kind,
            name: name.into(),
            text: text.into(),
        });
    }

    /// Attach a trait text, builder style.
    pub fn with_trait(mut self, combatant: CombatantId, name: &str, text: &str) -> Self {
        self.add(combatant, SourceKind::Trait, name, text);
        self
    }

    /// Attach a skill text, builder style.
    pub fn with_skill(mut self, combatant: CombatantId, name: &str, text: &str) -> Self {
        self.add(combatant, SourceKind::Skill, name, text);
        self
    }

    /// Attach a power text, builder style.
    pub fn with_power(mut self, combatant: CombatantId, name: &str, text: &str) -> Self {
        self.add(combatant, SourceKind::Power, name, text);
        self
    }

    /// Every entry for a combatant.
    pub fn entries(&self, combatant: CombatantId) -> &[SourceEntry] {
        self.entries
            .get(&combatant)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Drop every entry for a combatant.
    pub fn clear(&mut self, combatant: CombatantId) {
        self.entries.remove(&combatant);
    }
}

impl EffectSource for StaticSources {
    fn effect_texts(&self, combatant: CombatantId) -> Vec<String> {
        self.entries(combatant)
            .iter()
            .map(|e| e.text.clone())
            .collect()
    }
}

/// Collects a combatant's texts and dispatches them for one hook.
#[derive(Debug)]
pub struct EffectAggregator {
    source: Box<dyn EffectSource>,
}

impl Default for EffectAggregator {
    fn default() -> Self {
        Self::new(StaticSources::new())
    }
}

impl EffectAggregator {
    /// Aggregate over a source.
    pub fn new(source: impl EffectSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// The combatant's non-blank texts followed by `extra`.
    pub fn texts(&self, combatant: CombatantId, extra: &[String]) -> Vec<String> {
        self.source
            .effect_texts(combatant)
            .into_iter()
            .chain(extra.iter().cloned())
            .filter(|t| !t.trim().is_empty())
            .collect()
    }

    /// Resolve every text of `combatant` (plus `extra`) on `hook`.
    /// Returns how many texts matched at least one rule.
    pub fn dispatch(
        &self,
        registry: &EffectRegistry,
        combatant: CombatantId,
        extra: &[String],
        hook: Hook,
        ctx: &mut ResolutionContext<'_>,
    ) -> usize {
        ctx.hook = hook;
        let texts = self.texts(combatant, extra);
        let matched = registry.resolve_all(&texts, ctx);
        tracing::trace!(%hook, combatant = %combatant, texts = texts.len(), matched, "hook dispatched");
        matched
    }
}
