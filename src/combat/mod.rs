pub mod army;
pub mod engine;
pub mod error;
pub mod export_csv;
pub mod rng;
pub mod stacking;
pub mod stats;
pub mod turn;

pub use army::{ActiveEffect, Army, ArmyId, Side};
pub use engine::{
    prepare_battle, run_battle, run_prepared, BattleLogEntry, BattleState, BattleStatus, Winner,
};
pub use error::BattleError;
pub use export_csv::{battle_log_csv, battle_state_csv, parse_battle_log_csv, LogExportError};
pub use rng::{entropy_seed, trial_seed, RandomSource, Rng, SequenceRng};
pub use stacking::{Contribution, Layer, LayerTotals, StatKind, StatStack};
pub use stats::{army_stats, commander_stats, level_factor, progression_modifier, EffectiveStats};
pub use turn::{compute_damage, resolve_turn, select_target};
