//! Monte Carlo runner: the same matchup battled many times under independent randomness.
//!
//! Trial `i` always draws from `trial_seed(base_seed, i)`, so a seeded run aggregates to the same
//! summary whether trials run one after another or spread over a rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::{
    entropy_seed, prepare_battle, run_prepared, trial_seed, BattleError, BattleState, Rng, Winner,
};
use crate::data::{BalanceConfig, Formation};
use crate::parallel::{batch_ranges, Progress};

/// Trials handed to one worker between progress updates in parallel runs.
const TARGET_BATCHES_PER_THREAD: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialFailure {
    pub trial: usize,
    pub reason: String,
}

/// Aggregate of a Monte Carlo run, counted from the attacker's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub trials: usize,
    pub wins: usize,
    pub losses: usize,
    pub draws: usize,
    pub failed: usize,
    /// Percentage of completed trials the attacker won.
    pub win_rate: f64,
    /// Mean turns of completed trials.
    pub average_turns: f64,
    pub seed: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TrialFailure>,
    pub cancelled: bool,
}

impl MonteCarloSummary {
    pub fn completed(&self) -> usize {
        self.wins + self.losses + self.draws
    }

    pub fn loss_rate(&self) -> f64 {
        percentage(self.losses, self.completed())
    }

    pub fn draw_rate(&self) -> f64 {
        percentage(self.draws, self.completed())
    }
}

fn percentage(count: usize, of: usize) -> f64 {
    if of == 0 {
        0.0
    } else {
        count as f64 / of as f64 * 100.0
    }
}

#[derive(Debug, Clone)]
enum TrialOutcome {
    Finished { winner: Winner, turns: u32 },
    Failed(TrialFailure),
}

fn run_trial(template: &BattleState, config: &BalanceConfig, base_seed: u64, trial: usize) -> TrialOutcome {
    let mut rng = Rng::new(trial_seed(base_seed, trial as u64));
    let failure = |reason: String| {
        tracing::warn!(trial, %reason, "trial failed");
        TrialOutcome::Failed(TrialFailure { trial, reason })
    };
    match run_prepared(template, config, &mut rng) {
        Ok(state) => match state.winner() {
            Some(winner) => TrialOutcome::Finished {
                winner,
                turns: state.turn(),
            },
            None => failure("battle stopped without a conclusion".to_string()),
        },
        Err(err) => failure(err.to_string()),
    }
}

fn run_range(
    template: &BattleState,
    config: &BalanceConfig,
    base_seed: u64,
    (start, end): (usize, usize),
    progress: &Progress,
) -> Vec<TrialOutcome> {
    let mut outcomes = Vec::with_capacity(end - start);
    for trial in start..end {
        if progress.is_cancelled() {
            break;
        }
        outcomes.push(run_trial(template, config, base_seed, trial));
        progress.record_completed();
    }
    outcomes
}

fn summarize(trials: usize, seed: u64, outcomes: Vec<TrialOutcome>) -> MonteCarloSummary {
    let mut summary = MonteCarloSummary {
        trials,
        wins: 0,
        losses: 0,
        draws: 0,
        failed: 0,
        win_rate: 0.0,
        average_turns: 0.0,
        seed,
        failures: Vec::new(),
        cancelled: outcomes.len() < trials,
    };
    let mut turn_sum = 0u64;
    for outcome in outcomes {
        match outcome {
            TrialOutcome::Finished { winner, turns } => {
                turn_sum += u64::from(turns);
                match winner {
                    Winner::Attacker => summary.wins += 1,
                    Winner::Defender => summary.losses += 1,
                    Winner::Draw => summary.draws += 1,
                }
            }
            TrialOutcome::Failed(failure) => {
                summary.failed += 1;
                summary.failures.push(failure);
            }
        }
    }
    summary.failures.sort_by_key(|failure| failure.trial);
    let completed = summary.completed();
    summary.win_rate = percentage(summary.wins, completed);
    if completed > 0 {
        summary.average_turns = turn_sum as f64 / completed as f64;
    }
    summary
}

/// Run `trials` battles one after another.
pub fn run_monte_carlo(
    attacker: &Formation,
    defender: &Formation,
    config: &BalanceConfig,
    trials: usize,
    seed: Option<u64>,
) -> Result<MonteCarloSummary, BattleError> {
    run_monte_carlo_with_progress(attacker, defender, config, trials, seed, false, &Progress::default())
}

/// Like [run_monte_carlo] but spreads trials across the current rayon pool. Same seed, same
/// summary.
pub fn run_monte_carlo_parallel(
    attacker: &Formation,
    defender: &Formation,
    config: &BalanceConfig,
    trials: usize,
    seed: Option<u64>,
) -> Result<MonteCarloSummary, BattleError> {
    run_monte_carlo_with_progress(attacker, defender, config, trials, seed, true, &Progress::default())
}

/// Full-control entry point. `progress` is reset to `trials` and advanced after each trial;
/// cancelling it stops workers before their next trial and marks the summary cancelled.
///
/// Configuration errors are returned before any trial starts.
pub fn run_monte_carlo_with_progress(
    attacker: &Formation,
    defender: &Formation,
    config: &BalanceConfig,
    trials: usize,
    seed: Option<u64>,
    parallel: bool,
    progress: &Progress,
) -> Result<MonteCarloSummary, BattleError> {
    let template = prepare_battle(attacker, defender, config)?;
    let base_seed = seed.unwrap_or_else(entropy_seed);
    progress.start(trials);

    let outcomes: Vec<TrialOutcome> = if parallel {
        let batches = rayon::current_num_threads().max(1) * TARGET_BATCHES_PER_THREAD;
        batch_ranges(trials, batches)
            .into_par_iter()
            .flat_map_iter(|range| run_range(&template, config, base_seed, range, progress))
            .collect()
    } else {
        run_range(&template, config, base_seed, (0, trials), progress)
    };

    let summary = summarize(trials, base_seed, outcomes);
    tracing::debug!(
        trials,
        seed = base_seed,
        wins = summary.wins,
        losses = summary.losses,
        draws = summary.draws,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "monte carlo finished"
    );
    Ok(summary)
}
