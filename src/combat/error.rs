use thiserror::Error;

use crate::combat::army::Side;
use crate::data::ConfigError;

/// Why a battle could not start, or why it stopped before a conclusion.
#[derive(Debug, Error)]
pub enum BattleError {
    #[error("commander '{commander}': level {level} outside 1..=60")]
    InvalidLevel { commander: String, level: u8 },
    #[error("commander '{commander}': {stars} stars outside 1..={max}")]
    InvalidStars { commander: String, stars: u8, max: u8 },
    #[error("commander '{commander}': skill slot {slot} at level {level}, maximum is 5")]
    InvalidSkillLevel {
        commander: String,
        slot: usize,
        level: u8,
    },
    #[error("commander '{commander}': base stats must be finite, non-negative, with positive health")]
    InvalidBaseStats { commander: String },
    #[error("army led by '{commander}': effective {stat} overflows to a non-finite value")]
    NonFiniteStats {
        commander: String,
        stat: &'static str,
    },
    #[error("commander '{commander}' has no roles")]
    EmptyRoles { commander: String },
    #[error("army led by '{commander}' names the same commander as its secondary")]
    DuplicateSecondary { commander: String },
    #[error("army led by '{commander}' has no troops")]
    InvalidTroopCount { commander: String },
    #[error("{side} formation has no occupied slot")]
    EmptyFormation { side: Side },
    #[error("formation must have exactly 8 slots, got {len}")]
    FormationSize { len: usize },
    #[error("balance configuration rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("{side} army in slot {slot} is corrupted: {reason}")]
    CorruptedArmy {
        side: Side,
        slot: usize,
        reason: String,
    },
}

impl BattleError {
    /// Configuration errors are caught before turn one; the rest surface mid-battle.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::CorruptedArmy { .. })
    }
}
