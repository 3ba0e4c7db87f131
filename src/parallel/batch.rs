//! Batch distribution for parallel simulation.
//!
//! Splits Monte Carlo trials into contiguous ranges so each worker runs a batch sequentially and
//! checks for cancellation between its trials.

use crate::combat::BattleError;
use crate::data::{BalanceConfig, Formation};
use crate::parallel::pool::WorkerPool;
use crate::simulation::{run_monte_carlo_parallel, MonteCarloSummary};

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use warband::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + usize::from(i < remainder);
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Run a parallel Monte Carlo matchup on `pool` instead of the global rayon pool.
pub fn run_simulation_batches(
    attacker: &Formation,
    defender: &Formation,
    config: &BalanceConfig,
    trials: usize,
    seed: Option<u64>,
    pool: &WorkerPool,
) -> Result<MonteCarloSummary, BattleError> {
    pool.install(|| run_monte_carlo_parallel(attacker, defender, config, trials, seed))
}
