//! Content handlers: what each family of effect text does.
//!
//! Every handler is built by a factory from [`HandlerArgs`] so rule tables
//! can be loaded as data. Patterns live in the rule table, not here; a
//! handler only reads the named captures it documents.

pub mod damage;
pub mod modifiers;
pub mod movement;
pub mod resource;
pub mod status;

use regex::Regex;

use cb_core::EffectDuration;

use super::catalog::HandlerArgs;
use crate::error::MechResult;

/// Damage type alternation usable inside rule patterns.
pub const DAMAGE_TYPES: &str = "fire|cold|frost|lightning|thunder|acid|poison|necrotic|radiant|psychic|force|physical|slashing|piercing|bludgeoning";

/// Dice expression or flat integer, usable inside rule patterns.
pub const AMOUNT: &str = r"\d*d\d+(?:\s*[+-]\s*\d+)?|\d+";

/// A condition the standard rules know how to apply and cure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionSpec {
    /// Canonical name stored on the combatant.
    pub name: &'static str,
    /// Lowercase stem that identifies the condition in free text.
    pub stem: &'static str,
    /// Pattern that applies the condition.
    pub trigger: &'static str,
    /// Flag raised while active and cleared on expiry.
    pub flag: Option<&'static str>,
    /// Applies to the actor rather than the target.
    pub on_self: bool,
}

/// Conditions recognised by the standard rule table.
pub const CONDITIONS: &[ConditionSpec] = &[
    ConditionSpec {
        name: "Stunned",
        stem: "stun",
        trigger: r"\bstun(?:s|ned)?\b",
        flag: Some("stunned"),
        on_self: false,
    },
    ConditionSpec {
        name: "Paralyzed",
        stem: "paraly",
        trigger: r"\bparaly[sz](?:e|es|ed|is)\b",
        flag: Some("paralyzed"),
        on_self: false,
    },
    ConditionSpec {
        name: "Prone",
        stem: "prone",
        trigger: r"\bprone\b",
        flag: None,
        on_self: false,
    },
    ConditionSpec {
        name: "Frightened",
        stem: "fright",
        trigger: r"\b(?:frighten(?:s|ed)?|terrif(?:y|ies|ied))\b",
        flag: None,
        on_self: false,
    },
    ConditionSpec {
        name: "Poisoned",
        stem: "poison",
        trigger: r"\bpoison(?:s|ed)?\b",
        flag: None,
        on_self: false,
    },
    ConditionSpec {
        name: "Blinded",
        stem: "blind",
        trigger: r"\bblind(?:s|ed)?\b",
        flag: None,
        on_self: false,
    },
    ConditionSpec {
        name: "Restrained",
        stem: "restrain",
        trigger: r"\b(?:restrain(?:s|ed)?|entangle(?:s|d)?|grapple(?:s|d)?)\b",
        flag: None,
        on_self: false,
    },
    ConditionSpec {
        name: "Slowed",
        stem: "slow",
        trigger: r"\bslow(?:s|ed)?\b",
        flag: None,
        on_self: false,
    },
    ConditionSpec {
        name: "Burning",
        stem: "burn",
        trigger: r"\b(?:sets?\s+(?:\w+\s+)?(?:on\s+fire|ablaze)|burning)\b",
        flag: None,
        on_self: false,
    },
    ConditionSpec {
        name: "Bleeding",
        stem: "bleed",
        trigger: r"\bbleed(?:s|ing)?\b",
        flag: None,
        on_self: false,
    },
    ConditionSpec {
        name: "Hidden",
        stem: "hid",
        trigger: r"\b(?:becomes?\s+hidden|vanish(?:es)?|turns?\s+invisible)\b",
        flag: Some("hidden"),
        on_self: true,
    },
];

/// Find a known condition by its name or any word sharing its stem.
pub fn condition_spec(word: &str) -> Option<&'static ConditionSpec> {
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        return None;
    }
    CONDITIONS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(&word) || word.starts_with(c.stem))
}

/// Canonical display form of a damage type ("frost" reads as "Cold").
pub fn canonical_damage_type(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    match lower.as_str() {
        "frost" => "Cold".to_string(),
        other => title_case(other),
    }
}

/// Uppercase the first letter of every word.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads "for N rounds" and "permanently" out of effect text.
#[derive(Debug, Clone)]
pub struct DurationReader {
    rounds: Regex,
    permanent: Regex,
}

impl DurationReader {
    /// Compile the duration patterns.
    pub fn new() -> MechResult<Self> {
        Ok(Self {
            rounds: Regex::new(r"(?i)\bfor\s+(\d+)\s+(?:rounds?|turns?)\b")?,
            permanent: Regex::new(r"(?i)\bpermanent(?:ly)?\b")?,
        })
    }

    /// The duration the text names, or `default` rounds.
    pub fn read(&self, text: &str, default: u32) -> EffectDuration {
        if self.permanent.is_match(text) {
            return EffectDuration::Permanent;
        }
        let rounds = self
            .rounds
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(default);
        EffectDuration::Rounds(rounds)
    }
}

/// Who an effect lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// The primary target, falling back to the actor.
    Target,
    /// Always the actor.
    Actor,
}

impl Recipient {
    /// Read the `target` argument: `self` or `target` (the default).
    pub fn from_args(args: &HandlerArgs) -> Self {
        match args.get("target") {
            Some(t) if t.eq_ignore_ascii_case("self") => Self::Actor,
            _ => Self::Target,
        }
    }
}
