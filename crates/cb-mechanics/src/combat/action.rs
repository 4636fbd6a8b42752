//! Combat actions, the action funnel, and event logging.

use std::fmt;

use cb_core::{CombatantId, Facing, Position, Stat};
use serde::{Deserialize, Serialize};

use super::attack::{AttackReport, AttackRequest};
use super::clash::ClashReport;
use super::damage::{DamageReport, deliver};
use super::outcome::AttackTier;
use super::{CombatEngine, TurnReport};
use crate::effect::{EffectRegistry, HandlerFault, Hook, ResolutionContext};
use crate::error::{MechError, MechResult};

/// Registry rule that recognizes a resource-cost descriptor.
const COST_RULE: &str = "cost";

/// Direct use of an ability: no attack roll, texts resolve on ACTIVATE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    /// Who uses the ability.
    pub actor: CombatantId,
    /// Optional target.
    pub target: Option<CombatantId>,
    /// Ability name, used in the log.
    pub name: String,
    /// The ability's effect texts.
    pub effects: Vec<String>,
    /// Ability tier for damage text without dice.
    pub tier: u32,
}

impl Activation {
    /// An untargeted tier-1 ability with no texts.
    pub fn new(actor: CombatantId, name: impl Into<String>) -> Self {
        Self {
            actor,
            target: None,
            name: name.into(),
            effects: Vec::new(),
            tier: 1,
        }
    }

    /// Set the target, builder style.
    pub fn targeting(mut self, target: CombatantId) -> Self {
        self.target = Some(target);
        self
    }

    /// Add an effect text, builder style.
    pub fn with_effect(mut self, text: impl Into<String>) -> Self {
        self.effects.push(text.into());
        self
    }

    /// Set the tier, builder style.
    pub fn with_tier(mut self, tier: u32) -> Self {
        self.tier = tier;
        self
    }

    /// Effect texts with cost descriptors first, so a cost that cannot
    /// be paid stops the ability before anything else resolves.
    fn ordered_effects(&self, registry: &EffectRegistry) -> Vec<&str> {
        let texts = self.effects.iter().map(String::as_str);
        let Some(cost) = registry.rules().iter().find(|rule| rule.name() == COST_RULE) else {
            return texts.collect();
        };
        let (costs, rest): (Vec<&str>, Vec<&str>) =
            texts.partition(|text| cost.matcher().is_match(text));
        costs.into_iter().chain(rest).collect()
    }
}

/// Everything an activation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    /// Who used the ability.
    pub actor: CombatantId,
    /// Target, if any.
    pub target: Option<CombatantId>,
    /// Ability name.
    pub name: String,
    /// Texts that matched at least one rule.
    pub matched: usize,
    /// A cost could not be paid; nothing else happened.
    pub aborted: bool,
    /// HP changes from the damage payload.
    pub damage: DamageReport,
    /// Handler faults skipped during resolution.
    pub faults: Vec<HandlerFault>,
    /// Narrative lines.
    pub log: Vec<String>,
}

/// A completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    /// Who moved.
    pub actor: CombatantId,
    /// Start cell.
    pub from: Position,
    /// End cell.
    pub to: Position,
    /// Cells travelled.
    pub cells: u32,
    /// Narrative lines.
    pub log: Vec<String>,
}

/// An action a combatant can take. AI and player choices both arrive here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatAction {
    /// Attack a target.
    Attack(AttackRequest),
    /// Use an ability directly.
    Activate(Activation),
    /// Move to a cell.
    Move {
        /// Who moves.
        actor: CombatantId,
        /// Destination.
        to: Position,
    },
    /// Settle a pending clash, optionally on a different stat.
    ResolveClash {
        /// Override of the attack's stat.
        stat: Option<Stat>,
    },
    /// Pass to the next combatant.
    EndTurn,
}

impl fmt::Display for CombatAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attack(_) => write!(f, "Attack"),
            Self::Activate(activation) => write!(f, "Use {}", activation.name),
            Self::Move { to, .. } => write!(f, "Move to {to}"),
            Self::ResolveClash { stat: Some(stat) } => write!(f, "Resolve clash on {stat}"),
            Self::ResolveClash { stat: None } => write!(f, "Resolve clash"),
            Self::EndTurn => write!(f, "End turn"),
        }
    }
}

/// What an action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Result of an attack.
    Attack(AttackReport),
    /// Result of an activation.
    Activation(ActivationReport),
    /// Result of a move.
    Moved(MoveReport),
    /// Result of a clash contest.
    Clash(ClashReport),
    /// The next turn began.
    TurnEnded(TurnReport),
}

/// A recorded combat event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatEvent {
    /// Which round this happened in.
    pub round: u32,
    /// Who acted, if anyone.
    pub actor: Option<CombatantId>,
    /// What was done.
    pub action: String,
    /// Attack tier, for attacks and clashes.
    pub tier: Option<AttackTier>,
    /// Narrative lines.
    pub lines: Vec<String>,
}

impl CombatEngine<'_> {
    /// Run any action. The single entry point for both AI and players.
    pub fn perform(&mut self, action: CombatAction) -> MechResult<ActionOutcome> {
        match action {
            CombatAction::Attack(request) => self.attack(request).map(ActionOutcome::Attack),
            CombatAction::Activate(activation) => {
                self.activate(activation).map(ActionOutcome::Activation)
            }
            CombatAction::Move { actor, to } => self.move_to(actor, to).map(ActionOutcome::Moved),
            CombatAction::ResolveClash { stat } => self.resolve_clash(stat).map(ActionOutcome::Clash),
            CombatAction::EndTurn => self.end_turn().map(ActionOutcome::TurnEnded),
        }
    }

    /// Use an ability. Consumes the action unless a cost aborts it.
    pub fn activate(&mut self, activation: Activation) -> MechResult<ActivationReport> {
        self.require_action(activation.actor)?;
        if let Some(target) = activation.target {
            self.field.require(target)?;
        }
        let registry = self.registry;
        let texts = activation.ordered_effects(registry);

        let mut ctx = ResolutionContext::new(
            &mut self.field,
            self.dice.as_mut(),
            &self.config,
            activation.actor,
            activation.target,
            Hook::Activate,
        )
        .with_tier(activation.tier);
        let actor_name = ctx.actor()?.name.clone();
        ctx.narrate(format!("{actor_name} uses {}.", activation.name));
        let matched = registry.resolve_all(&texts, &mut ctx);

        let aborted = ctx.slots.aborted;
        let mut damage = DamageReport::default();
        if !aborted {
            let defender = activation.target.filter(|&t| t != activation.actor);
            if let (Some(defender), Some(_)) = (defender, ctx.slots.pending_damage) {
                self.sources
                    .dispatch(registry, defender, &[], Hook::OnDefend, &mut ctx);
            }
            damage = deliver(&mut ctx, activation.target)?;
        }

        let report = ActivationReport {
            actor: activation.actor,
            target: activation.target,
            name: activation.name.clone(),
            matched,
            aborted,
            damage,
            faults: std::mem::take(&mut ctx.faults),
            log: std::mem::take(&mut ctx.log),
        };
        tracing::debug!(actor = %actor_name, ability = %activation.name, matched, aborted, "ability resolved");

        if !aborted {
            self.field.require_mut(activation.actor)?.turn.action_used = true;
        }
        self.record(
            Some(activation.actor),
            CombatAction::Activate(activation).to_string(),
            None,
            report.log.clone(),
        );
        self.check_finished();
        Ok(report)
    }

    /// Move once per turn, up to the movement allowance. Allies may be
    /// passed through; a combatant flagged `phasing` passes through
    /// anything but must still end on a free cell.
    pub fn move_to(&mut self, actor: CombatantId, to: Position) -> MechResult<MoveReport> {
        let mover = self.require_turn(actor)?;
        let name = mover.name.clone();
        if mover.turn.moved {
            return Err(MechError::AlreadyMoved(name));
        }
        let from = mover.position;
        let team = mover.team.clone();
        let phasing = mover.has_flag("phasing");
        let illegal = |reason: String| MechError::IllegalMove { to, reason };

        let terrain = self.field.terrain();
        if to == from {
            return Err(illegal("already there".into()));
        }
        if !terrain.in_bounds(to) {
            return Err(illegal("out of bounds".into()));
        }
        if terrain.is_wall(to) {
            return Err(illegal("blocked".into()));
        }
        if self.field.occupant(to).is_some() {
            return Err(illegal("occupied".into()));
        }
        let cells = from.distance(to);
        let allowance = self.config.movement_cells;
        if cells > allowance {
            return Err(illegal(format!("{cells} cells exceeds the {allowance}-cell allowance")));
        }
        if !phasing {
            for cell in from.path_to(to) {
                if terrain.is_wall(cell) {
                    return Err(illegal(format!("path blocked at {cell}")));
                }
                if let Some(other) = self.field.occupant(cell).and_then(|id| self.field.get(id)) {
                    if other.team != team {
                        return Err(illegal(format!("path blocked by {}", other.name)));
                    }
                }
            }
        }

        self.field.place(actor, to)?;
        let mover = self.field.require_mut(actor)?;
        mover.facing = Facing::toward(from, to);
        mover.turn.moved = true;
        let log = vec![format!("{name} moves from {from} to {to}.")];
        tracing::debug!(combatant = %name, %from, %to, cells, "moved");
        self.record(
            Some(actor),
            CombatAction::Move { actor, to }.to_string(),
            None,
            log.clone(),
        );
        Ok(MoveReport {
            actor,
            from,
            to,
            cells,
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::CombatState;
    use crate::config::EngineConfig;
    use crate::dice::ScriptedRoller;
    use crate::sources::StaticSources;
    use cb_core::{Attributes, Battlefield, Combatant, Pool, TileGrid};

    fn duel_field() -> (Battlefield, CombatantId, CombatantId) {
        let mut field = Battlefield::new(TileGrid::new(10, 10));
        let a = field
            .add(
                Combatant::new("Aria", Attributes::new())
                    .with_team("red")
                    .at(1, 1)
                    .with_initiative(20),
            )
            .unwrap();
        let d = field
            .add(
                Combatant::new("Dorn", Attributes::new())
                    .with_team("blue")
                    .at(2, 1)
                    .with_initiative(1),
            )
            .unwrap();
        (field, a, d)
    }

    #[test]
    fn display_names_the_action() {
        let id = CombatantId::new();
        assert_eq!(
            CombatAction::Activate(Activation::new(id, "Firebolt")).to_string(),
            "Use Firebolt"
        );
        assert_eq!(
            CombatAction::Move {
                actor: id,
                to: Position::new(2, 3)
            }
            .to_string(),
            "Move to (2, 3)"
        );
        assert_eq!(
            CombatAction::ResolveClash {
                stat: Some(Stat::Reflexes)
            }
            .to_string(),
            "Resolve clash on Reflexes"
        );
        assert_eq!(CombatAction::EndTurn.to_string(), "End turn");
    }

    #[test]
    fn costs_resolve_before_other_text() {
        let activation = Activation::new(CombatantId::new(), "Nova")
            .with_effect("Deal 2d6 fire damage")
            .with_effect("Cost: 3 FP");
        let registry = EffectRegistry::standard().unwrap();
        assert_eq!(
            activation.ordered_effects(&registry),
            vec!["Cost: 3 FP", "Deal 2d6 fire damage"]
        );
    }

    #[test]
    fn cost_lookalikes_keep_their_place() {
        let activation = Activation::new(CombatantId::new(), "Masquerade")
            .with_effect("Deal 4 damage")
            .with_effect("Wear the costume")
            .with_effect("Accost the target")
            .with_effect("Costs 2 SP");
        let registry = EffectRegistry::standard().unwrap();
        assert_eq!(
            activation.ordered_effects(&registry),
            vec!["Costs 2 SP", "Deal 4 damage", "Wear the costume", "Accost the target"]
        );
        assert_eq!(
            activation.ordered_effects(&EffectRegistry::new()),
            vec!["Deal 4 damage", "Wear the costume", "Accost the target", "Costs 2 SP"]
        );
    }

    #[test]
    fn activation_damages_and_spends_the_action() {
        let (field, a, d) = duel_field();
        let registry = EffectRegistry::standard().unwrap();
        let hp = field.get(d).unwrap().hp();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default())
            .with_dice(ScriptedRoller::new([4, 2]));
        engine.start().unwrap();
        let report = engine
            .activate(
                Activation::new(a, "Firebolt")
                    .targeting(d)
                    .with_effect("Deal 2d6 fire damage"),
            )
            .unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.damage.primary, 6);
        assert_eq!(report.log, vec!["Aria uses Firebolt.", "6 Fire damage to Dorn!"]);
        assert_eq!(engine.field().get(d).unwrap().hp(), hp - 6);
        assert!(engine.field().get(a).unwrap().turn.action_used);
        assert!(matches!(
            engine.activate(Activation::new(a, "Again")),
            Err(MechError::ActionUsed(_))
        ));
    }

    #[test]
    fn nesting_ceiling_gates_chain_and_reflect() {
        let registry = EffectRegistry::standard().unwrap();
        for max_chain_depth in [0, 1] {
            let (mut field, a, d) = duel_field();
            let c = field
                .add(
                    Combatant::new("Cato", Attributes::new())
                        .with_team("blue")
                        .at(3, 1)
                        .with_initiative(2),
                )
                .unwrap();
            let sources = StaticSources::new().with_trait(d, "Thorns", "Reflects 50% of damage");
            let config = EngineConfig {
                max_chain_depth,
                ..EngineConfig::default()
            };
            let mut engine = CombatEngine::new(&registry, field, config).with_sources(sources);
            engine.start().unwrap();
            let report = engine
                .activate(
                    Activation::new(a, "Arc Bolt")
                        .targeting(d)
                        .with_effect("Deal 10 damage")
                        .with_effect("Chains to 1 additional target"),
                )
                .unwrap();
            assert_eq!(report.damage.primary, 10);
            if max_chain_depth == 0 {
                assert!(report.damage.splash.is_empty());
                assert_eq!(report.damage.reflected, 0);
                assert!(!report.log.iter().any(|l| l.contains("reflected")));
            } else {
                assert_eq!(report.damage.splash, vec![(c, 5)]);
                assert_eq!(report.damage.reflected, 5);
            }
        }
    }

    #[test]
    fn oversized_numbers_neither_panic_nor_wrap() {
        let (field, a, d) = duel_field();
        let registry = EffectRegistry::standard().unwrap();
        let hp = field.get(d).unwrap().hp();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default())
            .with_dice(ScriptedRoller::new([]));
        engine.start().unwrap();
        let report = engine
            .activate(
                Activation::new(a, "Rift")
                    .targeting(d)
                    .with_effect("Deal 2d4294967295 damage"),
            )
            .unwrap();
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.damage.primary, 0);
        assert_eq!(engine.field().get(d).unwrap().hp(), hp);

        let (field, a, d) = duel_field();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        engine.start().unwrap();
        let report = engine
            .activate(
                Activation::new(a, "Cataclysm")
                    .targeting(d)
                    .with_effect("Deal 2000000000 damage")
                    .with_effect("Deal 2000000000 damage"),
            )
            .unwrap();
        assert_eq!(report.damage.primary, hp);
        assert!(!engine.field().get(d).unwrap().is_alive());
    }

    #[test]
    fn unpaid_cost_keeps_the_action() {
        let (mut field, a, d) = duel_field();
        field.get_mut(a).unwrap().pools.fp.current = 1;
        let registry = EffectRegistry::standard().unwrap();
        let hp = field.get(d).unwrap().hp();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        engine.start().unwrap();
        let report = engine
            .activate(
                Activation::new(a, "Nova")
                    .targeting(d)
                    .with_effect("Deal 2d6 fire damage")
                    .with_effect("Cost: 3 FP"),
            )
            .unwrap();
        assert!(report.aborted);
        assert_eq!(report.damage, DamageReport::default());
        assert_eq!(engine.field().get(d).unwrap().hp(), hp);
        assert_eq!(engine.field().get(a).unwrap().pool(Pool::Fp).current, 1);
        assert!(!engine.field().get(a).unwrap().turn.action_used);
    }

    #[test]
    fn movement_rules() {
        let (mut field, a, d) = duel_field();
        field.terrain_mut().set_blocked(Position::new(1, 3), true);
        let registry = EffectRegistry::standard().unwrap();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        engine.start().unwrap();

        let illegal = |err: MechError| matches!(err, MechError::IllegalMove { .. });
        assert!(illegal(engine.move_to(a, Position::new(2, 1)).unwrap_err()));
        assert!(illegal(engine.move_to(a, Position::new(1, 3)).unwrap_err()));
        assert!(illegal(engine.move_to(a, Position::new(-1, 1)).unwrap_err()));
        assert!(illegal(engine.move_to(a, Position::new(9, 9)).unwrap_err()));
        // Straight through the enemy at (2, 1).
        assert!(illegal(engine.move_to(a, Position::new(3, 1)).unwrap_err()));
        assert!(matches!(
            engine.move_to(d, Position::new(2, 2)),
            Err(MechError::NotYourTurn(_))
        ));

        let report = engine.move_to(a, Position::new(1, 2)).unwrap();
        assert_eq!(report.cells, 1);
        assert_eq!(report.log, vec!["Aria moves from (1, 1) to (1, 2)."]);
        assert_eq!(engine.field().get(a).unwrap().facing, Facing::South);
        assert!(matches!(
            engine.move_to(a, Position::new(1, 1)),
            Err(MechError::AlreadyMoved(_))
        ));
        assert!(engine.field().terrain().is_wall(Position::new(1, 3)));
    }

    #[test]
    fn allies_and_phasing_pass_through() {
        let (mut field, a, _) = duel_field();
        field
            .add(
                Combatant::new("Bex", Attributes::new())
                    .with_team("red")
                    .at(1, 2)
                    .with_initiative(5),
            )
            .unwrap();
        let registry = EffectRegistry::standard().unwrap();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        engine.start().unwrap();
        assert!(engine.move_to(a, Position::new(1, 3)).is_ok());

        let (mut field, a, _) = duel_field();
        field.get_mut(a).unwrap().set_flag("phasing");
        let registry = EffectRegistry::standard().unwrap();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        engine.start().unwrap();
        assert!(engine.move_to(a, Position::new(3, 1)).is_ok());
    }

    #[test]
    fn perform_funnels_every_action() {
        let (field, a, d) = duel_field();
        let registry = EffectRegistry::standard().unwrap();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default())
            .with_dice(ScriptedRoller::new([10, 1, 10, 1, 15, 3]));
        engine.start().unwrap();

        let outcome = engine
            .perform(CombatAction::Attack(AttackRequest::new(a, d)))
            .unwrap();
        assert!(matches!(outcome, ActionOutcome::Attack(ref r) if r.tier == Some(AttackTier::Clash)));
        assert!(matches!(engine.end_turn(), Err(MechError::ClashPending)));

        let outcome = engine
            .perform(CombatAction::ResolveClash { stat: None })
            .unwrap();
        let ActionOutcome::Clash(report) = outcome else {
            panic!("expected a clash report");
        };
        assert_eq!(report.winner, a);
        assert_eq!(engine.state(), &CombatState::Active);

        let outcome = engine.perform(CombatAction::EndTurn).unwrap();
        assert!(matches!(outcome, ActionOutcome::TurnEnded(ref t) if t.actor == Some(d)));
        let actions: Vec<&str> = engine.log().iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["Start", "Attack Dorn", "Clash on Might", "End turn"]);
    }
}
