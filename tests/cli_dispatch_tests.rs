use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const ATTACKER: &str = "data/formations/vanguard_line.json";
const DEFENDER: &str = "data/formations/blaze_strike.json";

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_warband")
}

fn unique_temp_path(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("warband-{name}-{stamp}.json"))
}

#[test]
fn battle_command_emits_json() {
    let output = Command::new(bin())
        .args(["battle", ATTACKER, DEFENDER, "17"])
        .output()
        .expect("battle should run");

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value = serde_json::from_str(&stdout).expect("battle should emit json");
    assert_eq!(payload["seed"], 17);
    assert!(payload["battle"]["winner"].is_string());
    assert!(payload["battle"]["log"].is_array());
}

#[test]
fn battle_command_exports_csv() {
    let output = Command::new(bin())
        .args(["battle", ATTACKER, DEFENDER, "17", "--csv"])
        .output()
        .expect("battle should run");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("turn,action,damage,heal,effect,target"));
    assert!(lines.next().is_some_and(|row| row.starts_with("1,")));
}

#[test]
fn simulate_command_reports_a_summary() {
    let output = Command::new(bin())
        .args(["simulate", ATTACKER, DEFENDER, "20", "6", "--parallel"])
        .output()
        .expect("simulate should run");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(&stdout).expect("simulate should emit json");
    assert_eq!(payload["trials"], 20);
    assert_eq!(payload["seed"], 6);
    assert!(payload["win_rate"].is_number());
}

#[test]
fn validate_command_accepts_a_shipped_formation() {
    let output = Command::new(bin())
        .args(["validate", "data/formations/lone_warden.json"])
        .output()
        .expect("validate should run");

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("validation passed"));
}

#[test]
fn validate_command_rejects_a_broken_formation() {
    let path = unique_temp_path("broken");
    fs::write(
        &path,
        r#"{"slots":[{"primary":{"commander_id":"nobody","level":70,"stars":1,"skill_levels":[0,0,0,0]},"troop_count":10},null,null,null,null,null,null,null]}"#,
    )
    .expect("temp file should be writable");

    let output = Command::new(bin())
        .args(["validate", path.to_str().expect("utf-8 temp path")])
        .output()
        .expect("validate should run");
    let _ = fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("validation failed"));
}

#[test]
fn missing_formation_file_is_a_failure() {
    let output = Command::new(bin())
        .args(["battle", "does/not/exist.json", DEFENDER])
        .output()
        .expect("battle should run");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("battle failed"));
}

#[test]
fn no_command_prints_usage() {
    let output = Command::new(bin()).output().expect("binary should run");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage: warband"));
}
