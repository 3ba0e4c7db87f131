pub mod balance;
pub mod catalog;
pub mod commander;
pub mod formation;
pub mod loader;
pub mod validate;

use thiserror::Error;

pub use balance::{
    balance_from_env, load_balance, BalanceConfig, ConfigError, EffectDefinition, EffectKind,
    RarityBonus, RoleModifiers, RoleTable,
};
pub use catalog::{load_catalog, load_default_catalog, Catalog, CatalogFile, DEFAULT_CATALOG_PATH};
pub use commander::{BaseStats, Commander, Rarity, Role, SkillDefinition, TroopType, UserCommander};
pub use formation::{ArmySpec, Formation, Row, FORMATION_SLOTS, FRONT_ROW_SLOTS};
pub use loader::{load_formation, load_formation_file, CommanderDraft, FormationFile, SlotDraft};
pub use validate::{
    validate_formation_file, validate_formation_path, ValidationDiagnostic, ValidationReport,
    ValidationSeverity,
};

/// Failures turning catalog and formation files into engine inputs.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("unable to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse json '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("slot {slot}: unknown commander '{commander_id}'")]
    UnknownCommander { slot: usize, commander_id: String },
    #[error("slot {slot}: expected 4 skill levels, found {count}")]
    SkillSlots { slot: usize, count: usize },
    #[error("formation must have exactly 8 slots, found {count}")]
    SlotCount { count: usize },
}
