//! Property tests over randomly generated formations.
//!
//! Run more cases with: PROPTEST_CASES=5000 cargo test --release prop_battle

use proptest::prelude::*;

use warband::combat::{run_battle, Rng, Side};
use warband::data::{
    ArmySpec, BalanceConfig, BaseStats, Commander, Formation, Rarity, Role, TroopType, UserCommander,
    FORMATION_SLOTS,
};
use warband::simulation::run_monte_carlo;

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Tank),
        Just(Role::Nuker),
        Just(Role::Healer),
        Just(Role::Support),
        Just(Role::Disabler),
    ]
}

fn troop_type() -> impl Strategy<Value = TroopType> {
    prop_oneof![
        Just(TroopType::Infantry),
        Just(TroopType::Cavalry),
        Just(TroopType::Archer),
        Just(TroopType::Mixed),
    ]
}

fn user_commander() -> impl Strategy<Value = UserCommander> {
    (
        role(),
        troop_type(),
        10.0f64..2000.0,
        0.0f64..2000.0,
        100.0f64..5000.0,
        20.0f64..120.0,
        1u8..=60,
        1u8..=5,
        prop::array::uniform4(0u8..=5),
    )
        .prop_map(|(role, troop_type, attack, defense, health, speed, level, stars, skills)| {
            let commander = Commander {
                id: format!("{role}-{troop_type:?}"),
                name: format!("{role} {troop_type:?}"),
                rarity: Rarity::Epic,
                troop_type,
                roles: vec![role],
                base_stats: BaseStats {
                    attack,
                    defense,
                    health,
                    march_speed: speed,
                },
                skills: Vec::new(),
                synergies: Vec::new(),
            };
            UserCommander::new(commander, level, stars, skills)
        })
}

fn formation() -> impl Strategy<Value = Formation> {
    prop::collection::vec(
        (0..FORMATION_SLOTS, user_commander(), 1u32..200_000),
        1..=4,
    )
    .prop_map(|armies| {
        armies
            .into_iter()
            .fold(Formation::empty(), |formation, (slot, primary, troops)| {
                formation.with_slot(slot, ArmySpec::new(primary, troops))
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every battle ends within the turn limit with exactly one outcome and consistent armies.
    #[test]
    fn battles_terminate_consistently(attacker in formation(), defender in formation(), seed in any::<u64>()) {
        let config = BalanceConfig::default();
        let state = run_battle(&attacker, &defender, &config, &mut Rng::new(seed)).unwrap();

        prop_assert!(state.winner().is_some());
        prop_assert!(state.turn() >= 1 && state.turn() <= config.max_turns);
        if state.decided_by_turn_limit() {
            prop_assert_eq!(state.turn(), config.max_turns);
        }
        for side in [Side::Attacker, Side::Defender] {
            for army in state.armies(side) {
                prop_assert_eq!(army.is_alive, army.current_health > 0.0);
                prop_assert!(army.current_health >= 0.0 && army.current_health <= army.stats.max_health);
            }
        }
        prop_assert!(state.log().iter().all(|entry| entry.turn >= 1 && entry.turn <= state.turn()));
    }

    /// A fixed seed reproduces the battle exactly.
    #[test]
    fn battles_are_deterministic(attacker in formation(), defender in formation(), seed in any::<u64>()) {
        let config = BalanceConfig::default();
        let first = run_battle(&attacker, &defender, &config, &mut Rng::new(seed)).unwrap();
        let second = run_battle(&attacker, &defender, &config, &mut Rng::new(seed)).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Trial counts always add up.
    #[test]
    fn monte_carlo_conserves_trials(
        attacker in formation(),
        defender in formation(),
        trials in 0usize..24,
        seed in any::<u64>(),
    ) {
        let summary = run_monte_carlo(&attacker, &defender, &BalanceConfig::default(), trials, Some(seed)).unwrap();
        prop_assert_eq!(summary.wins + summary.losses + summary.draws + summary.failed, trials);
        prop_assert!((0.0..=100.0).contains(&summary.win_rate));
    }
}
