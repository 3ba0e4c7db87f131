//! Turn resolver. One call advances a battle by exactly one turn.
//!
//! Every alive army acts once, fastest first, and resolution is sequential: an army defeated
//! earlier in the turn does not act. Equal speeds are ordered by a random key drawn per army
//! per turn, so neither side holds a fixed first-move advantage.

use crate::combat::army::{ActiveEffect, Army, ArmyId, Side};
use crate::combat::engine::{BattleLogEntry, BattleState, BattleStatus, Winner};
use crate::combat::error::BattleError;
use crate::combat::rng::RandomSource;
use crate::data::{BalanceConfig, EffectDefinition, Role, Row};

/// Advance `state` by one turn and report whether the battle concluded.
///
/// Calling this on a concluded battle changes nothing.
pub fn resolve_turn<R>(
    state: &mut BattleState,
    config: &BalanceConfig,
    rng: &mut R,
) -> Result<BattleStatus, BattleError>
where
    R: RandomSource + ?Sized,
{
    if let Some(winner) = state.winner {
        return Ok(BattleStatus::Concluded(winner));
    }
    verify_integrity(state)?;

    state.turn += 1;
    let turn = state.turn;

    for id in initiative_order(state, rng) {
        take_action(state, id, config, rng);
    }

    for side in [Side::Attacker, Side::Defender] {
        for army in state.armies_mut(side).iter_mut() {
            army.tick_effects(turn);
        }
    }

    let status = conclude(state, config);
    tracing::trace!(
        turn,
        attackers_alive = state.alive_count(Side::Attacker),
        defenders_alive = state.alive_count(Side::Defender),
        "turn resolved"
    );
    Ok(status)
}

fn verify_integrity(state: &BattleState) -> Result<(), BattleError> {
    for side in [Side::Attacker, Side::Defender] {
        for army in state.armies(side) {
            if let Some(reason) = army.integrity_violation() {
                return Err(BattleError::CorruptedArmy {
                    side,
                    slot: army.id.slot,
                    reason,
                });
            }
        }
    }
    Ok(())
}

fn initiative_order<R>(state: &BattleState, rng: &mut R) -> Vec<ArmyId>
where
    R: RandomSource + ?Sized,
{
    let mut order: Vec<(f64, u64, ArmyId)> = Vec::new();
    for side in [Side::Attacker, Side::Defender] {
        for army in state.armies(side).iter().filter(|army| army.is_alive) {
            order.push((army.stats.speed, rng.next_u64(), army.id));
        }
    }
    order.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    order.into_iter().map(|(_, _, id)| id).collect()
}

/// First alive enemy in the front row, then the back row once the front has fallen.
pub fn select_target(state: &BattleState, enemy: Side) -> Option<ArmyId> {
    let armies = state.armies(enemy);
    let alive_in = |row: Row| {
        armies
            .iter()
            .filter(move |army| army.is_alive && army.row() == row)
            .min_by_key(|army| army.id.slot)
    };
    alive_in(Row::Front).or_else(|| alive_in(Row::Back)).map(|army| army.id)
}

/// Most wounded ally, lowest slot on ties. `None` when nobody is hurt.
///
/// Wounds are ranked by health fraction (`current / max`), not absolute health: a large army at
/// 30% is healed before a small one at 60% even when the small one has fewer hit points left.
pub fn heal_target(state: &BattleState, side: Side) -> Option<ArmyId> {
    state
        .armies(side)
        .iter()
        .filter(|army| army.is_damaged())
        .min_by(|a, b| {
            a.health_fraction()
                .total_cmp(&b.health_fraction())
                .then(a.id.slot.cmp(&b.id.slot))
        })
        .map(|army| army.id)
}

/// Damage of one hit before it is applied.
///
/// `variance_factor` is the per-hit roll, `1 ± variance`.
pub fn compute_damage(
    attacker: &Army,
    defender: &Army,
    config: &BalanceConfig,
    variance_factor: f64,
) -> f64 {
    let troop_factor = if attacker.troop_type.counters(defender.troop_type) {
        config.troop_advantage
    } else {
        1.0
    };
    let offense = attacker.stats.attack
        * attacker.attack_modifier()
        * config.roles.for_role(attacker.role).damage
        * troop_factor
        * variance_factor;
    let mitigation = defender.stats.defense
        * defender.defense_modifier()
        * config.roles.for_role(defender.role).defense
        * config.defense_weight;
    let chip = (attacker.stats.attack * config.chip_fraction).max(1.0);
    (offense - mitigation).max(chip)
}

fn roll_variance<R>(config: &BalanceConfig, rng: &mut R) -> f64
where
    R: RandomSource + ?Sized,
{
    1.0 + rng.range_f64(-config.variance, config.variance)
}

/// Effect a support or disabler casts this turn, if any is due.
fn scheduled_effect(config: &BalanceConfig, role: Role, turn: u32) -> Option<EffectDefinition> {
    let interval = config.effect_interval.max(1);
    let elapsed = turn.saturating_sub(1);
    if elapsed % interval != 0 {
        return None;
    }
    let effects = config.effects_for(role);
    if effects.is_empty() {
        return None;
    }
    let index = (elapsed / interval) as usize % effects.len();
    Some(effects[index].clone())
}

fn take_action<R>(state: &mut BattleState, id: ArmyId, config: &BalanceConfig, rng: &mut R)
where
    R: RandomSource + ?Sized,
{
    let turn = state.turn;
    let Some(actor) = state.army(id) else {
        return;
    };
    if !actor.is_alive {
        return;
    }
    if let Some(stun) = actor.is_stunned() {
        let entry = BattleLogEntry::new(turn, format!("{} is stunned and loses its action", actor.label()))
            .with_effect(stun.name.clone())
            .with_target(actor.label());
        state.push_log(entry);
        return;
    }

    match actor.role {
        Role::Healer => {
            if let Some(ally) = heal_target(state, id.side) {
                heal(state, id, ally, config, rng);
                return;
            }
        }
        Role::Support | Role::Disabler => {
            if let Some(effect) = scheduled_effect(config, actor.role, turn) {
                if cast(state, id, &effect) {
                    return;
                }
            }
        }
        Role::Tank | Role::Nuker => {}
    }

    attack(state, id, config, rng);
}

fn attack<R>(state: &mut BattleState, id: ArmyId, config: &BalanceConfig, rng: &mut R)
where
    R: RandomSource + ?Sized,
{
    let turn = state.turn;
    let Some(target_id) = select_target(state, id.side.opponent()) else {
        return;
    };
    let (Some(actor), Some(target)) = (state.army(id), state.army(target_id)) else {
        return;
    };
    let actor_label = actor.label();
    let damage = compute_damage(actor, target, config, roll_variance(config, rng));

    let Some(target) = state.army_mut(target_id) else {
        return;
    };
    let target_label = target.label();
    let defeated = target.take_damage(damage);

    state.push_log(
        BattleLogEntry::new(turn, format!("{actor_label} attacks {target_label}"))
            .with_damage(damage)
            .with_target(target_label.clone()),
    );
    if defeated {
        state.push_log(
            BattleLogEntry::new(turn, format!("{target_label} was defeated")).with_target(target_label),
        );
    }
}

fn heal<R>(state: &mut BattleState, id: ArmyId, ally: ArmyId, config: &BalanceConfig, rng: &mut R)
where
    R: RandomSource + ?Sized,
{
    let turn = state.turn;
    let Some(actor) = state.army(id) else {
        return;
    };
    let actor_label = actor.label();
    let amount = actor.stats.attack * config.heal_ratio * roll_variance(config, rng);

    let Some(target) = state.army_mut(ally) else {
        return;
    };
    let target_label = target.label();
    let restored = target.heal(amount);

    state.push_log(
        BattleLogEntry::new(turn, format!("{actor_label} heals {target_label}"))
            .with_heal(restored)
            .with_target(target_label),
    );
}

/// Land `effect` on its target. `false` when no valid target exists.
fn cast(state: &mut BattleState, id: ArmyId, effect: &EffectDefinition) -> bool {
    let turn = state.turn;
    let target_id = if effect.kind.targets_ally() {
        state
            .armies(id.side)
            .iter()
            .filter(|army| army.is_alive)
            .min_by_key(|army| army.id.slot)
            .map(|army| army.id)
    } else {
        select_target(state, id.side.opponent())
    };
    let (Some(target_id), Some(actor)) = (target_id, state.army(id)) else {
        return false;
    };
    let actor_label = actor.label();

    let Some(target) = state.army_mut(target_id) else {
        return false;
    };
    target.apply_effect(ActiveEffect {
        name: effect.name.clone(),
        kind: effect.kind,
        magnitude: effect.magnitude,
        remaining_turns: effect.duration_turns,
        applied_turn: turn,
    });
    let target_label = target.label();

    state.push_log(
        BattleLogEntry::new(turn, format!("{actor_label} casts {} on {target_label}", effect.name))
            .with_effect(effect.name.clone())
            .with_target(target_label),
    );
    true
}

fn conclude(state: &mut BattleState, config: &BalanceConfig) -> BattleStatus {
    let attackers_alive = state.alive_count(Side::Attacker) > 0;
    let defenders_alive = state.alive_count(Side::Defender) > 0;

    let winner = match (attackers_alive, defenders_alive) {
        (true, false) => Some(Winner::Attacker),
        (false, true) => Some(Winner::Defender),
        (false, false) => Some(Winner::Draw),
        (true, true) if state.turn >= config.max_turns => {
            state.decided_by_turn_limit = true;
            let attacker = state.health_fraction(Side::Attacker);
            let defender = state.health_fraction(Side::Defender);
            Some(if attacker > defender {
                Winner::Attacker
            } else if defender > attacker {
                Winner::Defender
            } else {
                Winner::Draw
            })
        }
        (true, true) => None,
    };

    match winner {
        Some(winner) => {
            state.winner = Some(winner);
            BattleStatus::Concluded(winner)
        }
        None => BattleStatus::InProgress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::army::fixtures::army;
    use crate::combat::rng::{Rng, SequenceRng};
    use crate::data::EffectKind;

    fn quiet_config() -> BalanceConfig {
        BalanceConfig {
            variance: 0.0,
            effects: Vec::new(),
            ..BalanceConfig::default()
        }
    }

    #[test]
    fn front_row_is_targeted_before_back_row() {
        let mut state = BattleState::from_armies(
            vec![army(Side::Attacker, 0, Role::Nuker, 100.0)],
            vec![
                army(Side::Defender, 2, Role::Tank, 100.0),
                army(Side::Defender, 1, Role::Tank, 100.0),
                army(Side::Defender, 4, Role::Nuker, 100.0),
            ],
        );
        assert_eq!(select_target(&state, Side::Defender).map(|id| id.slot), Some(1));

        state.defender[1].take_damage(1000.0);
        assert_eq!(select_target(&state, Side::Defender).map(|id| id.slot), Some(2));

        state.defender[0].take_damage(1000.0);
        assert_eq!(select_target(&state, Side::Defender).map(|id| id.slot), Some(4));

        state.defender[2].take_damage(1000.0);
        assert_eq!(select_target(&state, Side::Defender), None);
    }

    #[test]
    fn back_row_is_open_when_front_row_is_empty() {
        let state = BattleState::from_armies(
            vec![army(Side::Attacker, 0, Role::Nuker, 100.0)],
            vec![
                army(Side::Defender, 6, Role::Nuker, 100.0),
                army(Side::Defender, 5, Role::Nuker, 100.0),
            ],
        );
        assert_eq!(select_target(&state, Side::Defender).map(|id| id.slot), Some(5));
    }

    #[test]
    fn damage_is_floored_at_chip() {
        let config = quiet_config();
        let attacker = army(Side::Attacker, 0, Role::Tank, 100.0);
        let mut wall = army(Side::Defender, 0, Role::Tank, 100.0);
        wall.stats.defense = 1e9;
        let damage = compute_damage(&attacker, &wall, &config, 1.0);
        assert_eq!(damage, 100.0 * config.chip_fraction);
    }

    #[test]
    fn damage_follows_the_formula() {
        let config = quiet_config();
        let attacker = army(Side::Attacker, 0, Role::Nuker, 100.0);
        let defender = army(Side::Defender, 0, Role::Tank, 100.0);
        let expected = 100.0 * config.roles.nuker.damage * 1.1
            - 50.0 * config.roles.tank.defense * config.defense_weight;
        assert!((compute_damage(&attacker, &defender, &config, 1.1) - expected).abs() < 1e-9);
    }

    #[test]
    fn each_action_logs_one_entry_for_the_turn() {
        let config = quiet_config();
        let mut state = BattleState::from_armies(
            vec![army(Side::Attacker, 0, Role::Nuker, 10_000.0)],
            vec![army(Side::Defender, 0, Role::Nuker, 10_000.0)],
        );
        let status = resolve_turn(&mut state, &config, &mut Rng::new(3)).expect("turn resolves");
        assert_eq!(status, BattleStatus::InProgress);
        assert_eq!(state.log().len(), 2);
        assert!(state.log().iter().all(|entry| entry.turn == 1 && entry.damage.is_some()));
    }

    #[test]
    fn faster_army_acts_first() {
        let config = quiet_config();
        let mut slow = army(Side::Attacker, 0, Role::Nuker, 10_000.0);
        slow.stats.speed = 1.0;
        let fast = army(Side::Defender, 0, Role::Nuker, 10_000.0);
        let mut state = BattleState::from_armies(vec![slow], vec![fast]);
        resolve_turn(&mut state, &config, &mut Rng::new(9)).expect("turn resolves");
        assert!(state.log()[0].action.starts_with("defender#0"));
    }

    #[test]
    fn defeated_army_does_not_act_later_in_the_turn() {
        let config = quiet_config();
        let mut striker = army(Side::Attacker, 0, Role::Nuker, 100.0);
        striker.stats.speed = 50.0;
        striker.stats.attack = 10_000.0;
        let victim = army(Side::Defender, 0, Role::Nuker, 100.0);
        let mut state = BattleState::from_armies(vec![striker], vec![victim]);
        let status = resolve_turn(&mut state, &config, &mut Rng::new(1)).expect("turn resolves");
        assert_eq!(status, BattleStatus::Concluded(Winner::Attacker));
        assert_eq!(state.log().len(), 2);
        assert_eq!(state.log()[1].action, "defender#0 defender-0 was defeated");
        assert!(state.log()[1].damage.is_none());
    }

    #[test]
    fn healer_restores_most_wounded_ally_without_overhealing() {
        let config = quiet_config();
        let mut healer = army(Side::Attacker, 4, Role::Healer, 1000.0);
        healer.stats.speed = 100.0;
        let mut light = army(Side::Attacker, 0, Role::Tank, 1000.0);
        light.take_damage(100.0);
        let mut heavy = army(Side::Attacker, 1, Role::Tank, 1000.0);
        heavy.take_damage(10.0);
        heavy.stats.max_health = 20.0;
        heavy.current_health = 10.0;
        let mut enemy = army(Side::Defender, 0, Role::Tank, 1e9);
        enemy.stats.speed = 1.0;
        let mut state = BattleState::from_armies(vec![light, heavy, healer], vec![enemy]);

        let mut rng = Rng::new(5);
        let order = initiative_order(&state, &mut rng);
        assert_eq!(order[0].slot, 4);
        take_action(&mut state, order[0], &config, &mut rng);

        let entry = &state.log()[0];
        assert_eq!(entry.target.as_deref(), Some("attacker#1 attacker-1"));
        assert_eq!(entry.heal, Some(10.0));
        assert_eq!(state.attacker[1].current_health, 20.0);
    }

    #[test]
    fn heal_target_ranks_by_fraction_not_absolute_health() {
        let mut small = army(Side::Attacker, 0, Role::Tank, 100.0);
        small.current_health = 60.0;
        let mut large = army(Side::Attacker, 1, Role::Tank, 10_000.0);
        large.current_health = 3_000.0;
        let healthy = army(Side::Attacker, 2, Role::Healer, 500.0);
        let state = BattleState::from_armies(
            vec![small, large, healthy],
            vec![army(Side::Defender, 0, Role::Tank, 1000.0)],
        );
        assert_eq!(heal_target(&state, Side::Attacker).map(|id| id.slot), Some(1));
        assert_eq!(heal_target(&state, Side::Defender), None);
    }

    #[test]
    fn healer_attacks_when_nobody_is_hurt() {
        let config = quiet_config();
        let mut state = BattleState::from_armies(
            vec![army(Side::Attacker, 0, Role::Healer, 1000.0)],
            vec![army(Side::Defender, 0, Role::Tank, 1000.0)],
        );
        take_action(&mut state, ArmyId { side: Side::Attacker, slot: 0 }, &config, &mut Rng::new(2));
        assert!(state.log()[0].damage.is_some());
    }

    #[test]
    fn disabler_stun_skips_the_targets_next_action() {
        let config = BalanceConfig {
            variance: 0.0,
            effects: vec![EffectDefinition {
                name: "Shackle".to_string(),
                role: Role::Disabler,
                kind: EffectKind::Stun,
                magnitude: 0.0,
                duration_turns: 1,
            }],
            ..BalanceConfig::default()
        };
        let mut disabler = army(Side::Attacker, 0, Role::Disabler, 10_000.0);
        disabler.stats.speed = 100.0;
        let target = army(Side::Defender, 0, Role::Nuker, 10_000.0);
        let mut state = BattleState::from_armies(vec![disabler], vec![target]);

        resolve_turn(&mut state, &config, &mut Rng::new(4)).expect("turn resolves");
        assert_eq!(state.log()[0].effect.as_deref(), Some("Shackle"));
        assert!(state.log()[1].action.contains("stunned"));
        assert!(state.log()[1].damage.is_none());

        // applied on turn 1, so the single remaining turn is only spent at the end of turn 2
        resolve_turn(&mut state, &config, &mut Rng::new(4)).expect("turn resolves");
        let turn_two: Vec<_> = state.log().iter().filter(|e| e.turn == 2).collect();
        assert_eq!(turn_two.len(), 2);
        assert!(turn_two[1].action.contains("stunned"));

        resolve_turn(&mut state, &config, &mut Rng::new(4)).expect("turn resolves");
        let turn_three: Vec<_> = state.log().iter().filter(|e| e.turn == 3).collect();
        assert_eq!(turn_three.len(), 2);
        assert!(turn_three.iter().all(|e| e.damage.is_some()), "stun should have expired: {turn_three:?}");
    }

    #[test]
    fn support_buff_lands_on_lowest_slot_ally() {
        let config = BalanceConfig {
            variance: 0.0,
            effects: vec![EffectDefinition {
                name: "War Cry".to_string(),
                role: Role::Support,
                kind: EffectKind::AttackBuff,
                magnitude: 0.5,
                duration_turns: 2,
            }],
            ..BalanceConfig::default()
        };
        let mut state = BattleState::from_armies(
            vec![
                army(Side::Attacker, 2, Role::Tank, 1000.0),
                army(Side::Attacker, 5, Role::Support, 1000.0),
            ],
            vec![army(Side::Defender, 0, Role::Tank, 1000.0)],
        );
        state.turn = 1;
        take_action(&mut state, ArmyId { side: Side::Attacker, slot: 5 }, &config, &mut Rng::new(1));
        assert_eq!(state.attacker[0].effects.len(), 1);
        assert!((state.attacker[0].attack_modifier() - 1.5).abs() < 1e-12);

        // off-schedule turns fall back to attacking
        state.turn = 2;
        take_action(&mut state, ArmyId { side: Side::Attacker, slot: 5 }, &config, &mut Rng::new(1));
        assert!(state.log()[1].damage.is_some());
    }

    #[test]
    fn turn_limit_goes_to_higher_health_fraction() {
        let config = BalanceConfig {
            max_turns: 1,
            ..quiet_config()
        };
        let mut state = BattleState::from_armies(
            vec![army(Side::Attacker, 0, Role::Tank, 1e9)],
            vec![army(Side::Defender, 0, Role::Tank, 1e6)],
        );
        let status = resolve_turn(&mut state, &config, &mut Rng::new(8)).expect("turn resolves");
        assert_eq!(status, BattleStatus::Concluded(Winner::Attacker));
        assert!(state.decided_by_turn_limit());
    }

    #[test]
    fn equal_health_fraction_at_turn_limit_is_a_draw() {
        let config = BalanceConfig {
            max_turns: 3,
            ..quiet_config()
        };
        let mut state = BattleState::from_armies(
            vec![army(Side::Attacker, 0, Role::Tank, 1000.0)],
            vec![army(Side::Defender, 0, Role::Tank, 1000.0)],
        );
        state.turn = 3;
        assert_eq!(conclude(&mut state, &config), BattleStatus::Concluded(Winner::Draw));
        assert!(state.decided_by_turn_limit());
    }

    #[test]
    fn both_sides_wiped_is_a_draw() {
        let config = quiet_config();
        let mut a = army(Side::Attacker, 0, Role::Tank, 10.0);
        let mut d = army(Side::Defender, 0, Role::Tank, 10.0);
        a.take_damage(10.0);
        d.take_damage(10.0);
        let mut state = BattleState::from_armies(vec![a], vec![d]);
        let status = resolve_turn(&mut state, &config, &mut SequenceRng::new(vec![0])).expect("turn resolves");
        assert_eq!(status, BattleStatus::Concluded(Winner::Draw));
        assert!(!state.decided_by_turn_limit());
    }

    #[test]
    fn concluded_battle_is_left_untouched() {
        let config = quiet_config();
        let mut state = BattleState::from_armies(
            vec![army(Side::Attacker, 0, Role::Tank, 10.0)],
            vec![army(Side::Defender, 0, Role::Tank, 10.0)],
        );
        state.winner = Some(Winner::Defender);
        let status = resolve_turn(&mut state, &config, &mut Rng::new(1)).expect("no-op");
        assert_eq!(status, BattleStatus::Concluded(Winner::Defender));
        assert_eq!(state.turn(), 0);
        assert!(state.log().is_empty());
    }

    #[test]
    fn corrupted_army_aborts_the_turn() {
        let config = quiet_config();
        let mut broken = army(Side::Defender, 3, Role::Tank, 10.0);
        broken.current_health = f64::NAN;
        let mut state = BattleState::from_armies(vec![army(Side::Attacker, 0, Role::Tank, 10.0)], vec![broken]);
        let err = resolve_turn(&mut state, &config, &mut Rng::new(1)).unwrap_err();
        assert!(matches!(err, BattleError::CorruptedArmy { side: Side::Defender, slot: 3, .. }));
        assert!(!err.is_configuration());
    }
}
