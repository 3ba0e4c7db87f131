//! Run Monte Carlo once in sequential and once in parallel, then print timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_parallel_speedup [trials] [seed]
//!
//! Run from the project root so data/commanders.json and data/formations are available.

use std::process::ExitCode;
use std::time::Instant;

use warband::data::{load_catalog, load_formation, BalanceConfig, Formation, DEFAULT_CATALOG_PATH};
use warband::simulation::{run_monte_carlo, run_monte_carlo_parallel};

const ATTACKER: &str = "data/formations/vanguard_line.json";
const DEFENDER: &str = "data/formations/blaze_strike.json";

fn load_matchup() -> Result<(Formation, Formation), String> {
    let catalog = load_catalog(DEFAULT_CATALOG_PATH).map_err(|err| err.to_string())?;
    let attacker = load_formation(ATTACKER, &catalog).map_err(|err| err.to_string())?;
    let defender = load_formation(DEFENDER, &catalog).map_err(|err| err.to_string())?;
    Ok((attacker, defender))
}

fn main() -> ExitCode {
    warband::telemetry::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let trials = args.get(1).and_then(|raw| raw.parse().ok()).unwrap_or(20_000usize);
    let seed = args.get(2).and_then(|raw| raw.parse().ok()).unwrap_or(12345u64);

    let (attacker, defender) = match load_matchup() {
        Ok(matchup) => matchup,
        Err(err) => {
            eprintln!("failed to load matchup: {err}");
            return ExitCode::FAILURE;
        }
    };
    let config = BalanceConfig::default();

    println!("Monte Carlo: {trials} trials ({ATTACKER} vs {DEFENDER}, seed={seed})");
    println!();

    let t0 = Instant::now();
    let sequential = match run_monte_carlo(&attacker, &defender, &config, trials, Some(seed)) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("sequential run failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    let elapsed_seq = t0.elapsed();
    let seq_ms = elapsed_seq.as_secs_f64() * 1000.0;
    println!(
        "Sequential:  {:.2} ms  ({:.1} battles/s)",
        seq_ms,
        trials as f64 / elapsed_seq.as_secs_f64()
    );

    let t0 = Instant::now();
    let parallel = match run_monte_carlo_parallel(&attacker, &defender, &config, trials, Some(seed)) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("parallel run failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    let elapsed_par = t0.elapsed();
    let par_ms = elapsed_par.as_secs_f64() * 1000.0;
    println!(
        "Parallel:    {:.2} ms  ({:.1} battles/s)",
        par_ms,
        trials as f64 / elapsed_par.as_secs_f64()
    );

    println!();
    println!("Speedup:     {:.2}x (parallel vs sequential)", seq_ms / par_ms);

    if sequential != parallel {
        eprintln!("summaries differ between sequential and parallel runs");
        return ExitCode::FAILURE;
    }
    println!(
        "(Summaries match: {} wins, {} losses, {} draws, win rate {:.2}%)",
        parallel.wins, parallel.losses, parallel.draws, parallel.win_rate
    );
    ExitCode::SUCCESS
}
