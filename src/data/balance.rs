//! Balance tables for the battle engine: role multipliers, progression bonuses, variance, effects.
//!
//! Every field has a default so a balance file only needs the values it overrides. Files are
//! JSON or YAML, picked by extension.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::commander::{Rarity, Role, MAX_SKILL_LEVEL};

pub const BALANCE_PATH_ENV: &str = "WARBAND_BALANCE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read balance file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse balance json '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unable to parse balance yaml '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid balance value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleModifiers {
    /// Multiplier on outgoing damage.
    pub damage: f64,
    /// Multiplier on defense when this army is hit.
    pub defense: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTable {
    pub tank: RoleModifiers,
    pub nuker: RoleModifiers,
    pub healer: RoleModifiers,
    pub support: RoleModifiers,
    pub disabler: RoleModifiers,
}

impl Default for RoleTable {
    fn default() -> Self {
        Self {
            tank: RoleModifiers {
                damage: 0.85,
                defense: 1.3,
            },
            nuker: RoleModifiers {
                damage: 1.3,
                defense: 0.85,
            },
            healer: RoleModifiers {
                damage: 0.7,
                defense: 1.0,
            },
            support: RoleModifiers {
                damage: 0.9,
                defense: 1.0,
            },
            disabler: RoleModifiers {
                damage: 0.95,
                defense: 1.0,
            },
        }
    }
}

impl RoleTable {
    pub const fn for_role(&self, role: Role) -> RoleModifiers {
        match role {
            Role::Tank => self.tank,
            Role::Nuker => self.nuker,
            Role::Healer => self.healer,
            Role::Support => self.support,
            Role::Disabler => self.disabler,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RarityBonus {
    pub elite: f64,
    pub epic: f64,
    pub legendary: f64,
}

impl Default for RarityBonus {
    fn default() -> Self {
        Self {
            elite: 0.0,
            epic: 0.05,
            legendary: 0.1,
        }
    }
}

impl RarityBonus {
    pub const fn for_rarity(&self, rarity: Rarity) -> f64 {
        match rarity {
            Rarity::Elite => self.elite,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    AttackBuff,
    DefenseBuff,
    AttackDebuff,
    DefenseDebuff,
    Stun,
}

impl EffectKind {
    /// Buffs land on allies; everything else lands on the enemy target.
    pub const fn targets_ally(self) -> bool {
        matches!(self, Self::AttackBuff | Self::DefenseBuff)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub name: String,
    pub role: Role,
    pub kind: EffectKind,
    #[serde(default)]
    pub magnitude: f64,
    pub duration_turns: u32,
}

fn default_effects() -> Vec<EffectDefinition> {
    vec![
        EffectDefinition {
            name: "War Cry".to_string(),
            role: Role::Support,
            kind: EffectKind::AttackBuff,
            magnitude: 0.15,
            duration_turns: 2,
        },
        EffectDefinition {
            name: "Bulwark".to_string(),
            role: Role::Support,
            kind: EffectKind::DefenseBuff,
            magnitude: 0.2,
            duration_turns: 2,
        },
        EffectDefinition {
            name: "Shackle".to_string(),
            role: Role::Disabler,
            kind: EffectKind::Stun,
            magnitude: 0.0,
            duration_turns: 1,
        },
        EffectDefinition {
            name: "Sunder".to_string(),
            role: Role::Disabler,
            kind: EffectKind::DefenseDebuff,
            magnitude: 0.2,
            duration_turns: 2,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub max_turns: u32,
    /// Bonus per star above the first.
    pub star_step: f64,
    /// Cumulative bonus indexed by skill level 0..=5. Flattens toward level 5.
    pub skill_level_bonus: [f64; 6],
    pub rarity_bonus: RarityBonus,
    pub roles: RoleTable,
    /// Fraction of a secondary commander's effective stats added to the primary.
    pub support_multiplier: f64,
    /// Added to `support_multiplier` when primary and secondary share a synergy tag.
    pub synergy_bonus: f64,
    /// Half-width of the per-hit damage roll: factor is drawn from `1 ± variance`.
    pub variance: f64,
    pub defense_weight: f64,
    /// Minimum hit as a fraction of the attacker's effective attack.
    pub chip_fraction: f64,
    pub heal_ratio: f64,
    pub troop_advantage: f64,
    /// Support and disabler armies cast on turn 1 and every `effect_interval` turns after.
    pub effect_interval: u32,
    pub effects: Vec<EffectDefinition>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            max_turns: 50,
            star_step: 0.05,
            skill_level_bonus: [0.0, 0.02, 0.04, 0.06, 0.075, 0.085],
            rarity_bonus: RarityBonus::default(),
            roles: RoleTable::default(),
            support_multiplier: 0.2,
            synergy_bonus: 0.1,
            variance: 0.12,
            defense_weight: 0.5,
            chip_fraction: 0.05,
            heal_ratio: 0.5,
            troop_advantage: 1.1,
            effect_interval: 3,
            effects: default_effects(),
        }
    }
}

impl BalanceConfig {
    pub fn skill_bonus(&self, level: u8) -> f64 {
        let index = usize::from(level.min(MAX_SKILL_LEVEL));
        self.skill_level_bonus[index]
    }

    pub fn effects_for(&self, role: Role) -> Vec<&EffectDefinition> {
        self.effects.iter().filter(|effect| effect.role == role).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid("max_turns must be at least 1".to_string()));
        }
        if self.effect_interval == 0 {
            return Err(ConfigError::Invalid("effect_interval must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.variance) {
            return Err(ConfigError::Invalid(format!(
                "variance must be in [0, 1), got {}",
                self.variance
            )));
        }
        if !(0.0..1.0).contains(&self.support_multiplier) {
            return Err(ConfigError::Invalid(format!(
                "support_multiplier must be in [0, 1), got {}",
                self.support_multiplier
            )));
        }
        if self.chip_fraction <= 0.0 || !self.chip_fraction.is_finite() {
            return Err(ConfigError::Invalid("chip_fraction must be positive".to_string()));
        }
        if self
            .skill_level_bonus
            .windows(2)
            .any(|pair| pair[1] < pair[0])
        {
            return Err(ConfigError::Invalid(
                "skill_level_bonus must be non-decreasing".to_string(),
            ));
        }
        let non_negative = [
            ("star_step", self.star_step),
            ("synergy_bonus", self.synergy_bonus),
            ("defense_weight", self.defense_weight),
            ("heal_ratio", self.heal_ratio),
            ("troop_advantage", self.troop_advantage),
        ];
        for (name, value) in non_negative {
            if value < 0.0 || !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be non-negative")));
            }
        }
        for role in [Role::Tank, Role::Nuker, Role::Healer, Role::Support, Role::Disabler] {
            let modifiers = self.roles.for_role(role);
            if modifiers.damage < 0.0 || modifiers.defense < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "role modifiers for {role} must be non-negative"
                )));
            }
        }
        for effect in &self.effects {
            if effect.duration_turns == 0 {
                return Err(ConfigError::Invalid(format!(
                    "effect '{}' must last at least one turn",
                    effect.name
                )));
            }
            if effect.magnitude < 0.0 || !effect.magnitude.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "effect '{}' magnitude must be non-negative",
                    effect.name
                )));
            }
        }
        Ok(())
    }
}

/// Load and validate a balance file. `.yaml`/`.yml` parse as YAML, anything else as JSON.
pub fn load_balance(path: &str) -> Result<BalanceConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    let is_yaml = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let config: BalanceConfig = if is_yaml {
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })?
    } else {
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_string(),
            source,
        })?
    };
    config.validate()?;
    Ok(config)
}

/// Balance from `WARBAND_BALANCE` when set, defaults otherwise.
pub fn balance_from_env() -> Result<BalanceConfig, ConfigError> {
    match env::var(BALANCE_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => load_balance(path.trim()),
        _ => Ok(BalanceConfig::default()),
    }
}
