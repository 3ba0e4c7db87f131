//! Effective-stat calculator: turns a commander's catalog stats and progression into the numbers
//! the turn resolver fights with.
//!
//! ```text
//! level_factor = 1 + level / 100
//! max_health   = base_health × troops × level_factor                      (+ secondary share)
//! attack       = base_attack × troops × level_factor × (1 + stars + skills + rarity)
//! defense      = base_defense × troops × level_factor × (1 + stars + skills + rarity)
//! speed        = march_speed × level_factor
//! ```
//!
//! A secondary commander never fights. Its own effective attack, defense and health (same troop
//! count) are folded into the primary as a flat contribution scaled by the support multiplier.

use serde::{Deserialize, Serialize};

use crate::combat::error::BattleError;
use crate::combat::stacking::{Contribution, StatKind, StatStack};
use crate::data::{ArmySpec, BalanceConfig, UserCommander};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveStats {
    pub attack: f64,
    pub defense: f64,
    pub max_health: f64,
    pub speed: f64,
}

pub fn level_factor(level: u8) -> f64 {
    1.0 + f64::from(level) / 100.0
}

/// Star, skill and rarity bonuses summed into one modifier.
pub fn progression_modifier(commander: &UserCommander, config: &BalanceConfig) -> f64 {
    let star_bonus = f64::from(commander.stars.saturating_sub(1)) * config.star_step;
    let skill_bonus: f64 = commander
        .skill_levels
        .iter()
        .map(|&level| config.skill_bonus(level))
        .sum();
    let rarity_bonus = config.rarity_bonus.for_rarity(commander.commander.rarity);
    star_bonus + skill_bonus + rarity_bonus
}

fn stack_commander(
    commander: &UserCommander,
    troop_count: u32,
    config: &BalanceConfig,
) -> StatStack {
    let base = &commander.commander.base_stats;
    let troops = f64::from(troop_count);
    let level = level_factor(commander.level);
    let modifier = progression_modifier(commander, config);

    let mut stack = StatStack::new();
    stack.extend([
        Contribution::base(StatKind::Attack, base.attack * troops * level),
        Contribution::modifier(StatKind::Attack, modifier),
        Contribution::base(StatKind::Defense, base.defense * troops * level),
        Contribution::modifier(StatKind::Defense, modifier),
        Contribution::base(StatKind::Health, base.health * troops * level),
        Contribution::base(StatKind::Speed, base.march_speed * level),
    ]);
    stack
}

fn compose(stack: &StatStack) -> EffectiveStats {
    EffectiveStats {
        attack: stack.value(StatKind::Attack),
        defense: stack.value(StatKind::Defense),
        max_health: stack.value(StatKind::Health),
        speed: stack.value(StatKind::Speed),
    }
}

/// Effective stats of one commander leading `troop_count` troops on its own.
pub fn commander_stats(
    commander: &UserCommander,
    troop_count: u32,
    config: &BalanceConfig,
) -> Result<EffectiveStats, BattleError> {
    commander.validate()?;
    Ok(compose(&stack_commander(commander, troop_count, config)))
}

/// Fraction of the secondary's stats handed to the primary.
pub fn support_share(primary: &UserCommander, secondary: &UserCommander, config: &BalanceConfig) -> f64 {
    if primary.commander.shares_synergy_with(&secondary.commander) {
        config.support_multiplier + config.synergy_bonus
    } else {
        config.support_multiplier
    }
}

/// Effective stats for a whole formation slot, secondary included.
pub fn army_stats(spec: &ArmySpec, config: &BalanceConfig) -> Result<EffectiveStats, BattleError> {
    spec.validate()?;
    let mut stack = stack_commander(&spec.primary, spec.troop_count, config);
    if let Some(secondary) = &spec.secondary {
        let share = support_share(&spec.primary, secondary, config);
        let theirs = commander_stats(secondary, spec.troop_count, config)?;
        stack.extend([
            Contribution::flat(StatKind::Attack, theirs.attack * share),
            Contribution::flat(StatKind::Defense, theirs.defense * share),
            Contribution::flat(StatKind::Health, theirs.max_health * share),
        ]);
    }
    let stats = compose(&stack);
    ensure_finite(&stats, spec.primary.id())?;
    Ok(stats)
}

/// Finite base stats can still overflow once scaled by troops and level.
fn ensure_finite(stats: &EffectiveStats, commander: &str) -> Result<(), BattleError> {
    let checks = [
        ("attack", stats.attack),
        ("defense", stats.defense),
        ("health", stats.max_health),
        ("speed", stats.speed),
    ];
    match checks.iter().find(|(_, value)| !value.is_finite()) {
        Some(&(stat, _)) => Err(BattleError::NonFiniteStats {
            commander: commander.to_string(),
            stat,
        }),
        None => Ok(()),
    }
}
