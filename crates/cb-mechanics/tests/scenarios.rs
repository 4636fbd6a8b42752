//! End-to-end combat scenarios driven through the public engine API.

use cb_core::{Attributes, Battlefield, Combatant, CombatantId, EffectDuration, Pool, Stat, TileGrid};
use cb_mechanics::combat::{AttackRequest, AttackTier, CombatState};
use cb_mechanics::{
    Activation, CombatEngine, EffectRegistry, EngineConfig, MechError, ScriptedRoller, StaticSources,
};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Attacker (Might 14) at (1, 1) acting first; Defender adjacent to the east.
fn duel(attacker: Combatant) -> (Battlefield, CombatantId, CombatantId) {
    let mut field = Battlefield::new(TileGrid::new(8, 8));
    let a = field
        .add(attacker.with_team("red").at(1, 1).with_initiative(20))
        .unwrap();
    let d = field
        .add(
            Combatant::new("Defender", Attributes::new())
                .with_team("blue")
                .at(2, 1)
                .with_initiative(5),
        )
        .unwrap();
    (field, a, d)
}

fn attacker() -> Combatant {
    Combatant::new("Attacker", Attributes::new().with(Stat::Might, 14))
}

#[test]
fn weapon_text_deals_typed_damage_on_hit() {
    init_tracing();
    let registry = EffectRegistry::standard().unwrap();
    let (field, a, d) = duel(attacker());
    let hp = field.get(d).unwrap().hp();
    let mut engine = CombatEngine::new(&registry, field, EngineConfig::default())
        .with_dice(ScriptedRoller::new([15, 1, 12, 1, 1]));
    engine.start().unwrap();

    let report = engine
        .attack(AttackRequest::new(a, d).with_effect("Deal 1d1 Fire Damage"))
        .unwrap();

    assert_eq!(report.margin, Some(5));
    assert_eq!(report.tier, Some(AttackTier::Hit));
    assert_eq!(report.damage.primary, 1);
    assert_eq!(engine.field().get(d).unwrap().hp(), hp - 1);
    insta::assert_snapshot!(report.log.join("\n"), @r"
    Attacker attacks Defender: 17 vs 12.
    Attacker hits Defender.
    1 Fire damage to Defender!
    ");
}

#[test]
fn resistance_condition_halves_matching_damage() {
    init_tracing();
    let registry = EffectRegistry::standard().unwrap();
    let (mut field, a, d) = duel(attacker());
    field
        .get_mut(d)
        .unwrap()
        .add_condition("Resistance to Fire", EffectDuration::Rounds(3), None);
    let hp = field.get(d).unwrap().hp();
    let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
    engine.start().unwrap();

    let report = engine
        .activate(
            Activation::new(a, "Flame Lance")
                .targeting(d)
                .with_effect("Deal 10 fire damage"),
        )
        .unwrap();

    assert_eq!(report.damage.primary, 5);
    assert!(report.log.iter().any(|line| line == "5 Fire damage to Defender!"));
    assert_eq!(engine.field().get(d).unwrap().hp(), hp - 5);
}

#[test]
fn resistance_from_a_trait_applies_on_defense() {
    init_tracing();
    let registry = EffectRegistry::standard().unwrap();
    let (field, a, d) = duel(Combatant::new("Attacker", Attributes::new()));
    let hp = field.get(d).unwrap().hp();
    let sources = StaticSources::new().with_trait(d, "Ember Scales", "Resistance to fire");
    let mut engine = CombatEngine::new(&registry, field, EngineConfig::default())
        .with_sources(sources)
        .with_dice(ScriptedRoller::new([15, 1, 8, 1]));
    engine.start().unwrap();

    let report = engine
        .attack(AttackRequest::new(a, d).with_effect("Deal 10 fire damage"))
        .unwrap();

    assert_eq!(report.tier, Some(AttackTier::Hit));
    assert_eq!(report.damage.primary, 5);
    assert_eq!(engine.field().get(d).unwrap().hp(), hp - 5);
}

#[test]
fn unaffordable_cost_stops_the_ability() {
    init_tracing();
    let registry = EffectRegistry::standard().unwrap();
    let (field, a, d) = duel(attacker().with_pool(Pool::Sp, 3));
    let hp = field.get(d).unwrap().hp();
    let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
    engine.start().unwrap();

    let report = engine
        .activate(
            Activation::new(a, "Whirlwind")
                .targeting(d)
                .with_effect("Deal 2d6 slashing damage")
                .with_effect("Cost: 5 SP"),
        )
        .unwrap();

    assert!(report.aborted);
    assert!(report.log.iter().any(|line| line == "Not enough SP"));
    let caster = engine.field().get(a).unwrap();
    assert_eq!(caster.pool(Pool::Sp).current, 3);
    assert!(!caster.turn.action_used);
    assert_eq!(engine.field().get(d).unwrap().hp(), hp);
}

#[test]
fn stun_lasts_one_round_then_clears_its_flag() {
    init_tracing();
    let registry = EffectRegistry::standard().unwrap();
    let (field, a, d) = duel(attacker());
    assert!(field.get(d).unwrap().conditions.is_empty());
    let mut engine = CombatEngine::new(&registry, field, EngineConfig::default());
    engine.start().unwrap();

    engine
        .activate(Activation::new(a, "Thunderclap").targeting(d).with_effect("Stun target"))
        .unwrap();
    let target = engine.field().get(d).unwrap();
    assert_eq!(
        target.conditions.remaining("Stunned"),
        Some(EffectDuration::Rounds(1))
    );
    assert!(target.has_flag("stunned"));

    let turn = engine.end_turn().unwrap();
    assert_eq!(turn.actor, Some(d));
    assert!(turn.log.iter().any(|line| line == "Defender cannot act this turn."));
    assert!(matches!(
        engine.attack(AttackRequest::new(d, a)),
        Err(MechError::Incapacitated(_))
    ));

    let turn = engine.end_turn().unwrap();
    assert!(turn.new_round);
    assert_eq!(engine.round(), 2);
    assert!(turn.log.iter().any(|line| line == "Defender is no longer Stunned."));
    let target = engine.field().get(d).unwrap();
    assert!(!target.has_condition("Stunned"));
    assert!(!target.has_flag("stunned"));
}

#[test]
fn tied_totals_clash_without_touching_hp() {
    init_tracing();
    let registry = EffectRegistry::standard().unwrap();
    let (field, a, d) = duel(Combatant::new("Attacker", Attributes::new()));
    let hp = |engine: &CombatEngine<'_>, id| engine.field().get(id).unwrap().hp();
    let mut engine = CombatEngine::new(&registry, field, EngineConfig::default())
        .with_dice(ScriptedRoller::new([11, 1, 11, 1, 14, 6]));
    engine.start().unwrap();
    let (before_a, before_d) = (hp(&engine, a), hp(&engine, d));

    let report = engine.attack(AttackRequest::new(a, d)).unwrap();
    assert_eq!(report.margin, Some(0));
    assert_eq!(report.tier, Some(AttackTier::Clash));
    assert!(matches!(engine.state(), CombatState::Clash(_)));
    assert_eq!((hp(&engine, a), hp(&engine, d)), (before_a, before_d));
    assert!(matches!(engine.end_turn(), Err(MechError::ClashPending)));

    let clash = engine.resolve_clash(None).unwrap();
    assert_eq!(clash.winner, a);
    assert_eq!(clash.consequence, Some("shove"));
    assert_eq!(engine.state(), &CombatState::Active);
    assert_eq!((hp(&engine, a), hp(&engine, d)), (before_a, before_d));
}

/// Let two seeded brawlers trade blows for a while.
fn brawl(registry: &EffectRegistry, seed: u64) -> CombatEngine<'_> {
    let mut field = Battlefield::new(TileGrid::new(6, 6));
    field
        .add(Combatant::new("Red", Attributes::new().with(Stat::Might, 16)).with_team("red").at(2, 2))
        .unwrap();
    field
        .add(Combatant::new("Blue", Attributes::new().with(Stat::Reflexes, 14)).with_team("blue").at(3, 2))
        .unwrap();
    let config = EngineConfig {
        seed,
        ..EngineConfig::default()
    };
    let mut engine = CombatEngine::new(registry, field, config);
    engine.start().unwrap();
    for _ in 0..60 {
        if engine.is_over() {
            break;
        }
        let Some(actor) = engine.current() else {
            break;
        };
        let target = engine
            .field()
            .enemies_of(actor)
            .into_iter()
            .find(|c| c.is_alive())
            .map(|c| c.id);
        if let Some(target) = target {
            let _ = engine.attack(AttackRequest::new(actor, target).with_effect("Deal 1d8 damage"));
        }
        if engine.pending_clash().is_some() {
            engine.resolve_clash(None).unwrap();
        }
        if engine.is_over() {
            break;
        }
        engine.end_turn().unwrap();
    }
    engine
}

proptest! {
    #[test]
    fn pools_stay_within_bounds(seed in any::<u64>()) {
        let registry = EffectRegistry::standard().unwrap();
        let engine = brawl(&registry, seed);
        for combatant in engine.field().combatants() {
            for pool in [Pool::Hp, Pool::Cmp, Pool::Sp, Pool::Fp] {
                let value = combatant.pool(pool);
                prop_assert!(value.current >= 0 && value.current <= value.max);
            }
        }
        let rounds: Vec<u32> = engine.log().iter().map(|e| e.round).collect();
        prop_assert!(rounds.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn same_seed_replays_identically(seed in any::<u64>()) {
        let registry = EffectRegistry::standard().unwrap();
        let first: Vec<Vec<String>> = brawl(&registry, seed).log().iter().map(|e| e.lines.clone()).collect();
        let second: Vec<Vec<String>> = brawl(&registry, seed).log().iter().map(|e| e.lines.clone()).collect();
        prop_assert_eq!(first, second);
    }
}
