pub mod monte_carlo;

pub use monte_carlo::{
    run_monte_carlo, run_monte_carlo_parallel, run_monte_carlo_with_progress, MonteCarloSummary,
    TrialFailure,
};
