use crate::combat::{battle_state_csv, entropy_seed, run_battle, Rng};
use crate::data::{
    balance_from_env, load_catalog, load_formation, validate_formation_path, BalanceConfig, Catalog,
    Formation, ValidationSeverity, DEFAULT_CATALOG_PATH,
};
use crate::server;
use crate::simulation::{run_monte_carlo, run_monte_carlo_parallel};

pub const DEFAULT_TRIALS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Battle,
    Simulate,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("battle") => Some(Command::Battle),
        Some("simulate") => Some(Command::Simulate),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(),
        Some(Command::Battle) => handle_battle(args),
        Some(Command::Simulate) => handle_simulate(args),
        Some(Command::Validate) => handle_validate(args),
        None => {
            eprintln!("usage: warband <serve|battle|simulate|validate>");
            2
        }
    }
}

/// Positional arguments after the subcommand, flags removed.
fn positionals(args: &[String]) -> Vec<&str> {
    args.iter()
        .skip(2)
        .map(String::as_str)
        .filter(|arg| !arg.starts_with("--"))
        .collect()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

fn handle_serve() -> i32 {
    let bind_addr = server::bind_address();
    match server::run_server(&bind_addr) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

struct Matchup {
    attacker: Formation,
    defender: Formation,
    config: BalanceConfig,
}

fn load_matchup(attacker_path: &str, defender_path: &str) -> Result<Matchup, String> {
    let catalog: Catalog = load_catalog(DEFAULT_CATALOG_PATH).map_err(|err| err.to_string())?;
    let attacker = load_formation(attacker_path, &catalog).map_err(|err| err.to_string())?;
    let defender = load_formation(defender_path, &catalog).map_err(|err| err.to_string())?;
    let config = balance_from_env().map_err(|err| err.to_string())?;
    Ok(Matchup {
        attacker,
        defender,
        config,
    })
}

fn handle_battle(args: &[String]) -> i32 {
    let positional = positionals(args);
    let (Some(attacker_path), Some(defender_path)) = (positional.first(), positional.get(1)) else {
        eprintln!("usage: warband battle <attacker.json> <defender.json> [seed] [--csv]");
        return 2;
    };
    let seed = parse_optional_u64(positional.get(2).copied(), "seed").unwrap_or_else(entropy_seed);

    let matchup = match load_matchup(attacker_path, defender_path) {
        Ok(matchup) => matchup,
        Err(err) => {
            eprintln!("battle failed: {err}");
            return 1;
        }
    };
    let state = match run_battle(
        &matchup.attacker,
        &matchup.defender,
        &matchup.config,
        &mut Rng::new(seed),
    ) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("battle failed: {err}");
            return 1;
        }
    };

    let rendered = if has_flag(args, "--csv") {
        battle_state_csv(&state).map_err(|err| err.to_string())
    } else {
        serde_json::to_string_pretty(&serde_json::json!({ "seed": seed, "battle": state }))
            .map_err(|err| err.to_string())
    };
    match rendered {
        Ok(payload) => {
            println!("{}", payload.trim_end());
            0
        }
        Err(err) => {
            eprintln!("failed to render battle: {err}");
            1
        }
    }
}

fn handle_simulate(args: &[String]) -> i32 {
    let positional = positionals(args);
    let (Some(attacker_path), Some(defender_path)) = (positional.first(), positional.get(1)) else {
        eprintln!("usage: warband simulate <attacker.json> <defender.json> [trials] [seed] [--parallel]");
        return 2;
    };
    let trials = parse_usize_arg(positional.get(2).copied(), "trials", DEFAULT_TRIALS);
    let seed = parse_optional_u64(positional.get(3).copied(), "seed");

    let matchup = match load_matchup(attacker_path, defender_path) {
        Ok(matchup) => matchup,
        Err(err) => {
            eprintln!("simulation failed: {err}");
            return 1;
        }
    };
    let run = if has_flag(args, "--parallel") {
        run_monte_carlo_parallel
    } else {
        run_monte_carlo
    };
    let summary = match run(&matchup.attacker, &matchup.defender, &matchup.config, trials, seed) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("simulation failed: {err}");
            return 1;
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize simulation summary: {err}");
            1
        }
    }
}

fn handle_validate(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: warband validate <formation.json>");
        return 2;
    };
    let catalog = match load_catalog(DEFAULT_CATALOG_PATH) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("validation failed: {err}");
            return 1;
        }
    };

    match validate_formation_path(path, &catalog) {
        Ok(report) => {
            for diagnostic in &report.diagnostics {
                eprintln!("- {diagnostic}");
            }
            if report.has_errors() {
                eprintln!(
                    "validation failed: {} error(s), {} warning(s)",
                    report.count(ValidationSeverity::Error),
                    report.count(ValidationSeverity::Warning)
                );
                1
            } else {
                println!("validation passed: {path}");
                0
            }
        }
        Err(err) => {
            eprintln!("validation failed: {err}");
            1
        }
    }
}

fn parse_usize_arg(raw: Option<&str>, name: &str, default: usize) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}

fn parse_optional_u64(raw: Option<&str>, name: &str) -> Option<u64> {
    let value = raw?;
    match value.parse::<u64>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            eprintln!("invalid {name} '{value}', using a random one");
            None
        }
    }
}
