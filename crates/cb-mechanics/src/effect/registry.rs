//! Ordered pattern-to-handler rule table and its dispatcher.
//!
//! Every rule whose pattern matches the text, whose exclusions do not,
//! and whose hook set contains the current hook fires, in registration
//! order. A handler error is caught here, recorded, and skipped; it never
//! stops the rules after it. Only an aborted context (an unpaid cost)
//! stops dispatch.

use std::fmt;
use std::sync::Arc;

use regex::{Captures, Regex, RegexBuilder};

use super::context::{HandlerFault, Hook, ResolutionContext};
use crate::error::{MechError, MechResult};

/// A handler invoked with the match and the live context.
pub type Handler =
    Arc<dyn Fn(&EffectMatch<'_>, &mut ResolutionContext<'_>) -> MechResult<()> + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&EffectMatch<'_>, &mut ResolutionContext<'_>) -> MechResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The captures of one rule against one text.
#[derive(Debug)]
pub struct EffectMatch<'t> {
    rule: &'t str,
    text: &'t str,
    captures: Captures<'t>,
}

impl<'t> EffectMatch<'t> {
    /// Name of the rule that matched.
    pub fn rule(&self) -> &'t str {
        self.rule
    }

    /// The whole effect text.
    pub fn text(&self) -> &'t str {
        self.text
    }

    /// The span the pattern matched.
    pub fn matched(&self) -> &'t str {
        self.captures.get(0).map_or("", |m| m.as_str())
    }

    /// A named capture, if it participated.
    pub fn named(&self, name: &str) -> Option<&'t str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    /// A named capture that must be present.
    pub fn require(&self, name: &str) -> MechResult<&'t str> {
        self.named(name).ok_or_else(|| MechError::MalformedCapture {
            rule: self.rule.to_string(),
            group: name.to_string(),
        })
    }

    /// A named capture parsed as an integer. Absent captures are `None`.
    pub fn int(&self, name: &str) -> MechResult<Option<i32>> {
        self.named(name)
            .map(|raw| {
                raw.trim()
                    .parse::<i32>()
                    .map_err(|_| MechError::MalformedCapture {
                        rule: self.rule.to_string(),
                        group: name.to_string(),
                    })
            })
            .transpose()
    }

    /// Case-insensitive substring test on the whole text.
    pub fn text_mentions(&self, needle: &str) -> bool {
        self.text.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// A trigger pattern plus patterns that veto it.
///
/// All patterns are case-insensitive.
#[derive(Debug, Clone)]
pub struct Matcher {
    trigger: Regex,
    excludes: Vec<Regex>,
}

impl Matcher {
    /// Compile a trigger with no exclusions.
    pub fn new(pattern: &str) -> MechResult<Self> {
        Ok(Self {
            trigger: compile(pattern)?,
            excludes: Vec::new(),
        })
    }

    /// Add a vetoing pattern.
    pub fn exclude(mut self, pattern: &str) -> MechResult<Self> {
        self.excludes.push(compile(pattern)?);
        Ok(self)
    }

    /// Captures of the trigger, unless an exclusion also matches.
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        if self.excludes.iter().any(|ex| ex.is_match(text)) {
            return None;
        }
        self.trigger.captures(text)
    }

    /// Returns true if the text would fire this matcher.
    pub fn is_match(&self, text: &str) -> bool {
        self.captures(text).is_some()
    }

    /// The trigger pattern source.
    pub fn pattern(&self) -> &str {
        self.trigger.as_str()
    }
}

fn compile(pattern: &str) -> MechResult<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// One entry in the rule table.
#[derive(Clone)]
pub struct EffectRule {
    name: String,
    matcher: Matcher,
    hooks: Vec<Hook>,
    handler: Handler,
}

impl EffectRule {
    /// Create a rule that fires on the given hooks.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        hooks: &[Hook],
        handler: Handler,
    ) -> MechResult<Self> {
        Ok(Self {
            name: name.into(),
            matcher: Matcher::new(pattern)?,
            hooks: hooks.to_vec(),
            handler,
        })
    }

    /// Add vetoing patterns, builder style.
    pub fn excluding<S: AsRef<str>>(mut self, patterns: &[S]) -> MechResult<Self> {
        for pattern in patterns {
            self.matcher = self.matcher.exclude(pattern.as_ref())?;
        }
        Ok(self)
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Hooks this rule fires on.
    pub fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    /// Returns true if this rule fires on `hook`.
    pub fn fires_on(&self, hook: Hook) -> bool {
        self.hooks.contains(&hook)
    }
}

impl fmt::Debug for EffectRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRule")
            .field("name", &self.name)
            .field("pattern", &self.matcher.pattern())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Ordered rule table. Built at startup, read-only during resolution.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    rules: Vec<EffectRule>,
}

impl EffectRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Later rules fire after earlier ones.
    pub fn register(&mut self, rule: EffectRule) {
        tracing::trace!(rule = %rule.name, "effect rule registered");
        self.rules.push(rule);
    }

    /// Append a rule, builder style.
    pub fn with_rule(mut self, rule: EffectRule) -> Self {
        self.register(rule);
        self
    }

    /// Rules in firing order.
    pub fn rules(&self) -> &[EffectRule] {
        &self.rules
    }

    /// Names of every rule in firing order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve one effect text against the context's current hook.
    ///
    /// Returns true if at least one rule matched. Empty or blank text is
    /// a no-op that returns false.
    pub fn resolve(&self, text: &str, ctx: &mut ResolutionContext<'_>) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let mut matched = false;
        for rule in &self.rules {
            if ctx.slots.aborted {
                tracing::debug!(text, "resolution aborted; remaining rules skipped");
                break;
            }
            if !rule.fires_on(ctx.hook) {
                continue;
            }
            let Some(captures) = rule.matcher.captures(text) else {
                continue;
            };
            matched = true;
            let found = EffectMatch {
                rule: &rule.name,
                text,
                captures,
            };
            tracing::trace!(rule = %rule.name, hook = %ctx.hook, "effect rule fired");
            if let Err(err) = (rule.handler)(&found, ctx) {
                tracing::warn!(rule = %rule.name, text, error = %err, "effect handler failed");
                ctx.faults.push(HandlerFault {
                    rule: rule.name.clone(),
                    text: text.to_string(),
                    error: err.to_string(),
                });
            }
        }
        matched
    }

    /// Resolve an optional text. `None` is a no-op.
    pub fn resolve_opt(&self, text: Option<&str>, ctx: &mut ResolutionContext<'_>) -> bool {
        text.is_some_and(|t| self.resolve(t, ctx))
    }

    /// Resolve several texts in order, stopping once the context aborts.
    /// Returns how many texts matched at least one rule.
    pub fn resolve_all<S: AsRef<str>>(&self, texts: &[S], ctx: &mut ResolutionContext<'_>) -> usize {
        let mut matched = 0;
        for text in texts {
            if ctx.slots.aborted {
                break;
            }
            if self.resolve(text.as_ref(), ctx) {
                matched += 1;
            }
        }
        matched
    }
}
