//! Combat engine: turn loop, action economy, and resolution entry points.
//!
//! The engine owns the battlefield, the dice, and the turn order. It
//! borrows an [`EffectRegistry`] built once at startup. Attacks run the
//! state machine in [`attack`]; ability activations, movement and the
//! action funnel live in [`action`]. Every completed action appends a
//! [`CombatEvent`] to the combat log.

pub mod action;
pub mod attack;
pub mod clash;
pub mod damage;
pub mod outcome;
pub mod tactics;
pub mod turn;

pub use action::{ActionOutcome, Activation, ActivationReport, CombatAction, CombatEvent, MoveReport};
pub use attack::{AttackPhase, AttackReport, AttackRequest, RollLine};
pub use clash::{ClashEffect, ClashReport, ClashScene, ClashTable, PendingClash};
pub use damage::{DamageReport, Defenses, INJURY_TABLE, Injury, mitigate};
pub use outcome::{AttackTier, classify};
pub use tactics::Tactics;
pub use turn::{Initiative, TurnOrder};

use cb_core::{Battlefield, Combatant, CombatantId, Stat, Team};

use crate::config::EngineConfig;
use crate::dice::{DiceRoller, SeededRoller};
use crate::effect::EffectRegistry;
use crate::error::{MechError, MechResult};
use crate::sources::{EffectAggregator, EffectSource};

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatState {
    /// Combatants may be added; nobody acts yet.
    Setup,
    /// Turns are running.
    Active,
    /// A tied attack awaits its stat contest. Nothing else may happen.
    Clash(PendingClash),
    /// At most one team is left standing.
    Finished {
        /// The surviving team, if any.
        winner: Option<Team>,
    },
}

/// What happened between one actor's turn and the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    /// Round of the new turn.
    pub round: u32,
    /// Who acts now. `None` when nobody is left.
    pub actor: Option<CombatantId>,
    /// A round boundary was crossed.
    pub new_round: bool,
    /// Hazard, expiry and turn-start lines.
    pub log: Vec<String>,
}

/// A running combat.
#[derive(Debug)]
pub struct CombatEngine<'r> {
    registry: &'r EffectRegistry,
    config: EngineConfig,
    field: Battlefield,
    dice: Box<dyn DiceRoller>,
    sources: EffectAggregator,
    clash_table: ClashTable,
    order: TurnOrder,
    round: u32,
    state: CombatState,
    log: Vec<CombatEvent>,
}

impl<'r> CombatEngine<'r> {
    /// Create an engine in the setup state. Dice are seeded from the config.
    pub fn new(registry: &'r EffectRegistry, field: Battlefield, config: EngineConfig) -> Self {
        let dice = SeededRoller::new(config.seed);
        Self {
            registry,
            config,
            field,
            dice: Box::new(dice),
            sources: EffectAggregator::default(),
            clash_table: ClashTable::standard(),
            order: TurnOrder::default(),
            round: 0,
            state: CombatState::Setup,
            log: Vec::new(),
        }
    }

    /// Replace the dice, builder style.
    pub fn with_dice(mut self, dice: impl DiceRoller + 'static) -> Self {
        self.dice = Box::new(dice);
        self
    }

    /// Set where combatants' effect texts come from, builder style.
    pub fn with_sources(mut self, source: impl EffectSource + 'static) -> Self {
        self.sources = EffectAggregator::new(source);
        self
    }

    /// Replace the clash consequence table, builder style.
    pub fn with_clash_table(mut self, table: ClashTable) -> Self {
        self.clash_table = table;
        self
    }

    /// The rule registry.
    pub fn registry(&self) -> &EffectRegistry {
        self.registry
    }

    /// Engine tunables.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The battlefield.
    pub fn field(&self) -> &Battlefield {
        &self.field
    }

    /// The battlefield, mutably. For scenario setup and external tools.
    pub fn field_mut(&mut self) -> &mut Battlefield {
        &mut self.field
    }

    /// Lifecycle state.
    pub fn state(&self) -> &CombatState {
        &self.state
    }

    /// Current round, 0 before start.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Every recorded event.
    pub fn log(&self) -> &[CombatEvent] {
        &self.log
    }

    /// Initiative order.
    pub fn turn_order(&self) -> &TurnOrder {
        &self.order
    }

    /// Whose turn it is.
    pub fn current(&self) -> Option<CombatantId> {
        match self.state {
            CombatState::Active | CombatState::Clash(_) => self.order.current(),
            _ => None,
        }
    }

    /// The clash awaiting resolution.
    pub fn pending_clash(&self) -> Option<&PendingClash> {
        match &self.state {
            CombatState::Clash(pending) => Some(pending),
            _ => None,
        }
    }

    /// Returns true once at most one team has living members.
    pub fn is_over(&self) -> bool {
        matches!(self.state, CombatState::Finished { .. })
    }

    /// Add a combatant. After start it joins the end of the turn order.
    pub fn add_combatant(&mut self, combatant: Combatant) -> MechResult<CombatantId> {
        if self.is_over() {
            return Err(MechError::CombatOver);
        }
        let fixed = combatant.initiative;
        let id = self.field.add(combatant)?;
        if self.state != CombatState::Setup {
            let score = match fixed {
                Some(score) => score,
                None => self.roll_initiative(id)?,
            };
            self.order.push(id, score);
            tracing::debug!(combatant = %id, score, "joined combat");
        }
        Ok(id)
    }

    /// Roll initiative and begin round 1.
    pub fn start(&mut self) -> MechResult<TurnReport> {
        if self.state != CombatState::Setup {
            return Err(MechError::AlreadyStarted);
        }
        if self.field.is_empty() {
            return Err(MechError::NoCombatants);
        }
        let roster: Vec<(CombatantId, Option<i32>)> = self
            .field
            .combatants()
            .map(|c| (c.id, c.initiative))
            .collect();
        let mut slots = Vec::with_capacity(roster.len());
        for (id, fixed) in roster {
            let score = match fixed {
                Some(score) => score,
                None => self.roll_initiative(id)?,
            };
            slots.push(Initiative { combatant: id, score });
        }
        self.order = TurnOrder::new(slots);
        self.round = 1;
        self.state = CombatState::Active;
        tracing::info!(combatants = self.order.len(), "combat started");

        let mut report = self.seek_actor(false)?;
        report.log.insert(0, format!("Initiative: {}.", self.initiative_line()));
        self.record(None, "Start".to_string(), None, report.log.clone());
        self.check_finished();
        Ok(report)
    }

    /// End the current turn and hand over to the next living combatant.
    ///
    /// Crossing a round boundary applies the new actor's hazard, then ticks
    /// every living combatant's conditions.
    pub fn end_turn(&mut self) -> MechResult<TurnReport> {
        self.require_running()?;
        let actor = self.order.current();
        let wrapped = self.order.advance();
        if wrapped {
            self.round += 1;
        }
        let mut report = self.seek_actor(wrapped)?;
        report.new_round |= wrapped;
        self.record(actor, CombatAction::EndTurn.to_string(), None, report.log.clone());
        self.check_finished();
        Ok(report)
    }

    /// Settle the pending clash. `stat` overrides the attack's stat.
    pub fn resolve_clash(&mut self, stat: Option<Stat>) -> MechResult<ClashReport> {
        let pending = match &self.state {
            CombatState::Clash(pending) => *pending,
            CombatState::Setup => return Err(MechError::NotStarted),
            CombatState::Finished { .. } => return Err(MechError::CombatOver),
            CombatState::Active => return Err(MechError::NoClashPending),
        };
        let stat = stat.unwrap_or(pending.stat);
        let report = clash::contest(
            &mut self.field,
            self.dice.as_mut(),
            &self.config,
            &self.clash_table,
            pending,
            stat,
        )?;
        self.state = CombatState::Active;
        self.record(
            Some(pending.attacker),
            format!("Clash on {stat}"),
            Some(AttackTier::Clash),
            report.log.clone(),
        );
        self.check_finished();
        Ok(report)
    }

    fn roll_initiative(&mut self, id: CombatantId) -> MechResult<i32> {
        let modifier = self.field.require(id)?.modifier(Stat::Reflexes);
        Ok(self.dice.d20() as i32 + modifier)
    }

    fn initiative_line(&self) -> String {
        self.order
            .slots()
            .iter()
            .filter_map(|s| {
                self.field
                    .get(s.combatant)
                    .map(|c| format!("{} ({})", c.name, s.score))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Walk forward from the current slot to the first living combatant
    /// and begin their turn.
    fn seek_actor(&mut self, mut tick_due: bool) -> MechResult<TurnReport> {
        let mut report = TurnReport::default();
        for _ in 0..=self.order.len() {
            if let Some(id) = self.order.current() {
                if self.is_alive(id) {
                    self.begin_turn(id, tick_due, &mut report.log)?;
                    tick_due = false;
                    if self.is_alive(id) {
                        report.actor = Some(id);
                        break;
                    }
                }
            }
            if self.order.advance() {
                self.round += 1;
                report.new_round = true;
                tick_due = true;
            }
        }
        report.round = self.round;
        Ok(report)
    }

    fn begin_turn(&mut self, id: CombatantId, tick_due: bool, log: &mut Vec<String>) -> MechResult<()> {
        let position = self.field.require(id)?.position;
        if let Some(hazard) = self.field.terrain().hazard_at(position).cloned() {
            let combatant = self.field.require_mut(id)?;
            let defenses = Defenses::from_conditions(combatant, Some(hazard.damage_type.as_str()));
            let lost = combatant.take_damage(mitigate(hazard.damage, defenses, true, false));
            log.push(format!(
                "{} takes {lost} {} damage from the {} underfoot!",
                combatant.name,
                hazard.damage_type,
                hazard.name.to_lowercase()
            ));
            if !combatant.is_alive() {
                log.push(format!("{} falls!", combatant.name));
            }
        }
        if tick_due {
            self.tick_round(log);
        }

        let combatant = self.field.require_mut(id)?;
        if combatant.is_alive() {
            combatant.reset_turn();
            log.push(format!("Round {}: {}'s turn.", self.round, combatant.name));
            if combatant.is_incapacitated() {
                log.push(format!("{} cannot act this turn.", combatant.name));
            }
            tracing::debug!(round = self.round, combatant = %combatant.name, "turn started");
        }
        Ok(())
    }

    fn tick_round(&mut self, log: &mut Vec<String>) {
        let living: Vec<CombatantId> = self.field.living().map(|c| c.id).collect();
        for id in living {
            if let Some(combatant) = self.field.get_mut(id) {
                for expired in combatant.tick_conditions() {
                    log.push(format!("{} is no longer {}.", combatant.name, expired.name));
                }
            }
        }
    }

    fn is_alive(&self, id: CombatantId) -> bool {
        self.field.get(id).is_some_and(Combatant::is_alive)
    }

    fn require_running(&self) -> MechResult<()> {
        match self.state {
            CombatState::Active => Ok(()),
            CombatState::Setup => Err(MechError::NotStarted),
            CombatState::Clash(_) => Err(MechError::ClashPending),
            CombatState::Finished { .. } => Err(MechError::CombatOver),
        }
    }

    /// The actor, if it is their turn and they can act.
    fn require_turn(&self, actor: CombatantId) -> MechResult<&Combatant> {
        self.require_running()?;
        let combatant = self.field.require(actor)?;
        if self.order.current() != Some(actor) {
            return Err(MechError::NotYourTurn(combatant.name.clone()));
        }
        if combatant.is_incapacitated() {
            return Err(MechError::Incapacitated(combatant.name.clone()));
        }
        Ok(combatant)
    }

    /// As [`Self::require_turn`], and the action is unspent.
    fn require_action(&self, actor: CombatantId) -> MechResult<()> {
        let combatant = self.require_turn(actor)?;
        if combatant.turn.action_used {
            return Err(MechError::ActionUsed(combatant.name.clone()));
        }
        Ok(())
    }

    fn record(&mut self, actor: Option<CombatantId>, action: String, tier: Option<AttackTier>, lines: Vec<String>) {
        self.log.push(CombatEvent {
            round: self.round,
            actor,
            action,
            tier,
            lines,
        });
    }

    fn check_finished(&mut self) {
        if self.state != CombatState::Active {
            return;
        }
        let teams = self.field.teams_standing();
        if teams.len() <= 1 {
            let winner = teams.into_iter().next();
            tracing::info!(winner = ?winner, round = self.round, "combat over");
            self.state = CombatState::Finished { winner };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedRoller;
    use cb_core::{Attributes, EffectDuration, Hazard, Pool, Position, TileGrid};

    fn registry() -> EffectRegistry {
        EffectRegistry::standard().unwrap()
    }

    fn skirmish() -> (Battlefield, CombatantId, CombatantId) {
        let mut field = Battlefield::new(TileGrid::new(8, 8));
        let a = field
            .add(
                Combatant::new("Aria", Attributes::new())
                    .with_team("red")
                    .at(1, 1)
                    .with_initiative(15),
            )
            .unwrap();
        let b = field
            .add(
                Combatant::new("Brom", Attributes::new())
                    .with_team("blue")
                    .at(2, 1)
                    .with_initiative(10),
            )
            .unwrap();
        (field, a, b)
    }

    #[test]
    fn combat_lifecycle() {
        let registry = registry();
        let (field, a, b) = skirmish();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        assert_eq!(engine.state(), &CombatState::Setup);
        assert!(matches!(engine.end_turn(), Err(MechError::NotStarted)));

        let report = engine.start().unwrap();
        assert_eq!(report.actor, Some(a));
        assert_eq!(engine.round(), 1);
        assert!(report.log[0].starts_with("Initiative: Aria (15), Brom (10)"));
        assert!(matches!(engine.start(), Err(MechError::AlreadyStarted)));

        let report = engine.end_turn().unwrap();
        assert_eq!(report.actor, Some(b));
        assert!(!report.new_round);

        let report = engine.end_turn().unwrap();
        assert_eq!(report.actor, Some(a));
        assert!(report.new_round);
        assert_eq!(engine.round(), 2);
        assert_eq!(engine.log().len(), 3);
    }

    #[test]
    fn empty_battlefield_cannot_start() {
        let registry = registry();
        let mut engine = CombatEngine::new(&registry, Battlefield::new(TileGrid::new(2, 2)), EngineConfig::default());
        assert!(matches!(engine.start(), Err(MechError::NoCombatants)));
    }

    #[test]
    fn rolled_initiative_uses_the_dice() {
        let registry = registry();
        let mut field = Battlefield::new(TileGrid::new(4, 4));
        let a = field
            .add(Combatant::new("A", Attributes::new()).with_team("red"))
            .unwrap();
        let b = field
            .add(Combatant::new("B", Attributes::new()).with_team("blue").at(1, 0))
            .unwrap();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default())
            .with_dice(ScriptedRoller::new([4, 17]));
        engine.start().unwrap();
        assert_eq!(engine.turn_order().ids(), vec![b, a]);
    }

    #[test]
    fn dead_combatants_are_skipped() {
        let registry = registry();
        let (mut field, a, b) = skirmish();
        let c = field
            .add(
                Combatant::new("Cato", Attributes::new())
                    .with_team("blue")
                    .at(5, 5)
                    .with_initiative(5),
            )
            .unwrap();
        field.get_mut(b).unwrap().take_damage(999);
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        engine.start().unwrap();
        assert_eq!(engine.current(), Some(a));
        let report = engine.end_turn().unwrap();
        assert_eq!(report.actor, Some(c));
    }

    #[test]
    fn hazard_burns_before_conditions_tick() {
        let registry = registry();
        let (mut field, a, b) = skirmish();
        field
            .terrain_mut()
            .set_hazard(Position::new(1, 1), Some(Hazard::fire(3)));
        field
            .get_mut(a)
            .unwrap()
            .add_condition("Burning", EffectDuration::Rounds(1), None);
        let hp = field.get(a).unwrap().hp();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        engine.start().unwrap();
        engine.end_turn().unwrap();
        let report = engine.end_turn().unwrap();
        assert_eq!(report.actor, Some(a));
        assert_eq!(
            report.log,
            vec![
                "Aria takes 3 Fire damage from the fire underfoot!".to_string(),
                "Aria is no longer Burning.".to_string(),
                "Round 2: Aria's turn.".to_string(),
            ]
        );
        // Start of round 1 burns too.
        assert_eq!(engine.field().get(a).unwrap().hp(), hp - 6);
        assert_eq!(engine.current(), Some(a));
        assert_ne!(engine.current(), Some(b));
    }

    #[test]
    fn summons_join_the_end_of_the_order() {
        let registry = registry();
        let (field, a, b) = skirmish();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        engine.start().unwrap();
        let wolf = engine
            .add_combatant(
                Combatant::new("Wolf", Attributes::new())
                    .with_team("red")
                    .at(0, 0)
                    .with_initiative(30),
            )
            .unwrap();
        assert_eq!(engine.turn_order().ids(), vec![a, b, wolf]);
        engine.end_turn().unwrap();
        assert_eq!(engine.end_turn().unwrap().actor, Some(wolf));
    }

    #[test]
    fn stunned_actor_cannot_act_but_can_pass() {
        let registry = registry();
        let (mut field, a, _) = skirmish();
        field
            .get_mut(a)
            .unwrap()
            .add_condition("Stunned", EffectDuration::Rounds(1), Some("stunned"));
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        let report = engine.start().unwrap();
        assert!(report.log.contains(&"Aria cannot act this turn.".to_string()));
        let err = engine.move_to(a, Position::new(1, 2)).unwrap_err();
        assert!(matches!(err, MechError::Incapacitated(name) if name == "Aria"));
        assert!(engine.end_turn().is_ok());
    }

    #[test]
    fn combat_ends_with_one_team_standing() {
        let registry = registry();
        let (field, _, b) = skirmish();
        let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
        engine.start().unwrap();
        engine.field_mut().get_mut(b).unwrap().damage_pool(Pool::Hp, 999);
        engine.end_turn().unwrap();
        assert_eq!(
            engine.state(),
            &CombatState::Finished {
                winner: Some(Team::new("red"))
            }
        );
        assert!(matches!(engine.end_turn(), Err(MechError::CombatOver)));
    }
}
