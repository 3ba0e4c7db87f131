//! Battle log as CSV: one row per log entry, columns `turn,action,damage,heal,effect,target`.
//! Absent values are empty cells. [parse_battle_log_csv] reads the same shape back so exported
//! logs can be diffed or replayed into tooling.

use serde::Deserialize;
use thiserror::Error;

use crate::combat::engine::{BattleLogEntry, BattleState};

pub const LOG_COLUMNS: [&str; 6] = ["turn", "action", "damage", "heal", "effect", "target"];

#[derive(Debug, Error)]
pub enum LogExportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("log is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}

pub fn battle_log_csv(entries: &[BattleLogEntry]) -> Result<String, LogExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(LOG_COLUMNS)?;
    for entry in entries {
        writer.write_record([
            entry.turn.to_string(),
            entry.action.clone(),
            optional_number(entry.damage),
            optional_number(entry.heal),
            entry.effect.clone().unwrap_or_default(),
            entry.target.clone().unwrap_or_default(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn battle_state_csv(state: &BattleState) -> Result<String, LogExportError> {
    battle_log_csv(state.log())
}

#[derive(Debug, Deserialize)]
struct LogRow {
    turn: u32,
    action: String,
    damage: Option<f64>,
    heal: Option<f64>,
    effect: Option<String>,
    target: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub fn parse_battle_log_csv(input: &str) -> Result<Vec<BattleLogEntry>, LogExportError> {
    let mut reader = csv::Reader::from_reader(input.as_bytes());
    let mut entries = Vec::new();
    for row in reader.deserialize::<LogRow>() {
        let row = row?;
        entries.push(BattleLogEntry {
            turn: row.turn,
            action: row.action,
            damage: row.damage,
            heal: row.heal,
            effect: non_empty(row.effect),
            target: non_empty(row.target),
        });
    }
    Ok(entries)
}
