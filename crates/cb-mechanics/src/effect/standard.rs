//! The built-in rule table.
//!
//! Order matters only where rules interact: the cost rule comes first so
//! an unpaid cost aborts before anything else fires.

use super::catalog::{HandlerCatalog, RuleSpec};
use super::context::Hook;
use super::handlers::{AMOUNT, CONDITIONS, DAMAGE_TYPES};
use super::registry::EffectRegistry;
use crate::error::MechResult;

const ACTIVE: &[Hook] = &[Hook::Activate, Hook::OnHit];
const ATTACK: &[Hook] = &[Hook::OnAttack];
const ATTACK_OR_ACTIVATE: &[Hook] = &[Hook::OnAttack, Hook::Activate];
const DEFEND: &[Hook] = &[Hook::OnDefend];

/// The standard rule specs, in firing order.
pub fn standard_rules() -> Vec<RuleSpec> {
    let mut rules = vec![
        RuleSpec::new(
            "cost",
            r"\bcosts?\s*:?\s*(?P<amount>\d+)\s*(?P<pool>HP|CMP|SP|FP)\b",
            &[Hook::Activate, Hook::OnAttack],
            "cost",
        ),
        // Attacker modifiers.
        RuleSpec::new(
            "to-hit bonus",
            r"\+\s*(?P<bonus>\d+)\s+(?:to\s+)?(?:hit|attacks?(?:\s+rolls?)?)\b",
            ATTACK,
            "to_hit",
        ),
        RuleSpec::new(
            "advantage",
            r"\badvantage\s+on\s+(?:the\s+|all\s+|its\s+|your\s+)?(?:attacks?|attack\s+rolls?|strikes?)\b",
            ATTACK,
            "advantage",
        )
        .excluding(r"\battacks?\s+against\b"),
        RuleSpec::new(
            "disadvantage",
            r"\bdisadvantage\s+on\s+(?:the\s+|all\s+|its\s+|your\s+)?(?:attacks?|attack\s+rolls?|strikes?)\b",
            ATTACK,
            "disadvantage",
        )
        .excluding(r"\battacks?\s+against\b"),
        RuleSpec::new(
            "auto-hit",
            r"\b(?:never\s+miss(?:es)?|always\s+hits?|auto-?\s*hits?|cannot\s+miss)\b",
            ATTACK,
            "auto_hit",
        ),
        RuleSpec::new(
            "crit range",
            r"\bcrit(?:ical)?s?(?:\s+hits?)?\s+on\s+(?:a\s+)?(?:natural\s+)?(?P<face>\d+)",
            ATTACK,
            "crit_range",
        ),
        RuleSpec::new(
            "ignore armor",
            r"\bignores?\s+(?:all\s+)?(?:armou?r|damage\s+reduction)\b",
            ATTACK_OR_ACTIVATE,
            "ignore_armor",
        ),
        RuleSpec::new(
            "ignore resistance",
            r"\bignores?\s+(?:all\s+)?(?:resistances?|immunit(?:y|ies))\b",
            ATTACK_OR_ACTIVATE,
            "ignore_resistance",
        ),
        // Defender modifiers.
        RuleSpec::new(
            "defense bonus",
            r"\+\s*(?P<bonus>\d+)\s+(?:to\s+)?(?:defen[cs]e|AC|armou?r\s+class)\b",
            DEFEND,
            "defense_bonus",
        ),
        RuleSpec::new(
            "defensive advantage",
            r"\b(?:advantage\s+on\s+(?:defen[cs]e|dodge)|attack(?:er)?s\s+(?:against\s+(?:you|it|them)\s+)?ha(?:ve|s)\s+disadvantage)",
            DEFEND,
            "defense_advantage",
        ),
        RuleSpec::new(
            "crit immunity",
            r"\b(?:immune\s+to\s+crit(?:ical)?s?(?:\s+hits?)?|crit(?:ical)?\s+immun(?:e|ity)|cannot\s+be\s+crit(?:ically\s+hit|ted)?)",
            DEFEND,
            "crit_immunity",
        ),
        RuleSpec::new(
            "immunity",
            format!(r"\bimmun(?:e|ity)\s+to\s+(?P<kind>{DAMAGE_TYPES})\b"),
            DEFEND,
            "immunity",
        )
        .excluding(r"\b(?:not|loses?|no)\s+(?:longer\s+)?immun"),
        RuleSpec::new(
            "resistance",
            format!(r"\bresist(?:ance|ant|s)?\s+(?:to\s+)?(?P<kind>{DAMAGE_TYPES})\b"),
            DEFEND,
            "resistance",
        )
        .excluding(r"\b(?:gains?|grants?|ignores?)\s+(?:all\s+)?resist"),
        RuleSpec::new(
            "vulnerability",
            format!(r"\bvulnerab(?:le|ility)\s+to\s+(?P<kind>{DAMAGE_TYPES})\b"),
            DEFEND,
            "vulnerability",
        ),
        RuleSpec::new(
            "damage reduction",
            r"\b(?:(?:damage\s+reduction|DR)\s*:?\s*(?P<amount>\d+)|reduces?\s+(?:all\s+)?(?:incoming\s+)?damage\s+(?:taken\s+)?by\s+(?P<amount2>\d+))",
            DEFEND,
            "damage_reduction",
        )
        .excluding(r"\bignores?\s+(?:all\s+)?damage\s+reduction"),
        RuleSpec::new(
            "reflect",
            r"\breflects?\s+(?:(?P<pct>\d+)\s*%\s*(?:of\s+)?)?(?:the\s+|all\s+)?(?:damage|attacks?)",
            DEFEND,
            "reflect",
        ),
        // Payloads.
        RuleSpec::new(
            "composure damage",
            format!(r"\b(?P<dice>{AMOUNT})\s+(?:composure|cmp|stress|mental)\s+damage\b"),
            ACTIVE,
            "composure_damage",
        ),
        RuleSpec::new(
            "damage",
            format!(
                r"(?:\bdeals?\s+(?:(?P<dice>{AMOUNT})\s+)?|\b(?P<dice2>\d*d\d+(?:\s*[+-]\s*\d+)?)\s+)(?:(?P<kind>{DAMAGE_TYPES})\s+)?damage\b"
            ),
            ACTIVE,
            "damage",
        )
        .excluding(r"\b(?:composure|cmp|stress|mental)\s+damage\b")
        .excluding(r"\b(?:no|half)\s+damage\b"),
        RuleSpec::new(
            "heal",
            format!(
                r"\b(?P<verb>heals?|restores?|regains?|recovers?)\s+(?:the\s+target\s+for\s+|an\s+ally\s+for\s+)?(?P<amount>{AMOUNT})\s*(?P<pool>HP|CMP|SP|FP|hit\s+points|composure|stamina|focus)?\b"
            ),
            ACTIVE,
            "heal",
        ),
        RuleSpec::new(
            "lifesteal",
            r"(?:\b(?P<pct>\d+)\s*%\s*)?\b(?:lifesteal|life\s*steal|drains?\s+life|vampiric)\b",
            ACTIVE,
            "lifesteal",
        ),
        RuleSpec::new(
            "area",
            r"\b(?P<feet>\d+)\s*-?\s*(?:ft\.?|feet|foot)\s*-?\s*(?:radius|burst|sphere|aura|blast)\b",
            ACTIVE,
            "area",
        ),
        RuleSpec::new(
            "chain",
            r"\bchains?\s+to\s+(?P<count>\d+)\s+(?:additional\s+|other\s+|more\s+|nearby\s+)?(?:targets?|enem(?:y|ies)|foes?|creatures?)\b",
            ACTIVE,
            "chain",
        ),
        // Conditions.
        RuleSpec::new(
            "saving throw",
            r"(?:\bDC\s*(?P<dc>\d+)\s+)?\b(?P<stat>[a-z]+)\s+sav(?:e|ing\s+throw)\s+or\s+(?:be\s+|become\s+|fall\s+|is\s+)?(?:knocked\s+)?(?P<condition>[a-z]+)",
            ACTIVE,
            "saving_throw",
        ),
        RuleSpec::new(
            "cure",
            r"\b(?:cures?|removes?|ends?)\s+(?:the\s+|any\s+|all\s+)?(?:target's\s+)?(?P<condition>stun\w*|paraly\w*|prone|fright\w*|poison\w*|blind\w*|restrain\w*|slow\w*|burn\w*|bleed\w*)",
            ACTIVE,
            "cure",
        ),
        RuleSpec::new(
            "grant resistance",
            format!(r"\b(?:gains?|grants?)\s+resistance\s+to\s+(?P<kind>{DAMAGE_TYPES})\b"),
            &[Hook::Activate],
            "grant_resistance",
        ),
        // Movement and terrain.
        RuleSpec::new(
            "push",
            r"\bpush(?:es)?\b[^.]*?\b(?P<feet>\d+)\s*(?:ft|feet|foot)\b",
            ACTIVE,
            "push",
        ),
        RuleSpec::new(
            "pull",
            r"\bpulls?\b[^.]*?\b(?P<feet>\d+)\s*(?:ft|feet|foot)\b",
            ACTIVE,
            "pull",
        ),
        RuleSpec::new(
            "teleport",
            r"\bteleports?\b[^.]*?\b(?P<feet>\d+)\s*(?:ft|feet|foot)\b",
            &[Hook::Activate],
            "teleport",
        ),
        RuleSpec::new(
            "ignite",
            r"\b(?:ignites?|sets?\s+fire\s+to|sets?\s+ablaze)\s+the\s+(?:ground|floor|terrain)\b",
            ACTIVE,
            "ignite",
        ),
    ];
    rules.extend(CONDITIONS.iter().map(|spec| {
        let stem = spec.stem;
        let mut rule = RuleSpec::new(spec.name, spec.trigger, ACTIVE, "status")
            .excluding(r"\bsav(?:e|ing\s+throw)\s+or\b")
            .excluding(format!(
                r"\b(?:cures?|removes?|ends?)\s+(?:the\s+|any\s+|all\s+)?(?:target's\s+)?{stem}"
            ))
            .excluding(format!(r"\b(?:immun\w*|resist\w*)\s+(?:to\s+)?(?:being\s+)?{stem}"))
            .arg("condition", spec.name);
        if spec.name == "Poisoned" {
            rule = rule.excluding(r"\bpoison\s+damage\b");
        }
        if let Some(flag) = spec.flag {
            rule = rule.arg("flag", flag);
        }
        if spec.on_self {
            rule = rule.arg("target", "self");
        }
        rule
    }));
    rules
}

impl EffectRegistry {
    /// The built-in rule table.
    pub fn standard() -> MechResult<Self> {
        Self::from_specs(&standard_rules(), &HandlerCatalog::standard())
    }
}
