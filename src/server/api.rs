use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::{entropy_seed, run_battle, BattleError, BattleState, Rng};
use crate::data::{
    balance_from_env, load_default_catalog, BalanceConfig, Catalog, Commander, ConfigError,
    Formation, FormationFile, RosterError,
};
use crate::server::jobs;
use crate::simulation::{run_monte_carlo_parallel, MonteCarloSummary};

pub const DEFAULT_TRIALS: usize = 1000;
pub const MAX_TRIALS: usize = 100_000;

/// Two formation files plus optional inline commanders that extend the shipped catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchupRequest {
    pub attacker: FormationFile,
    pub defender: FormationFile,
    #[serde(default)]
    pub commanders: Vec<Commander>,
    pub seed: Option<u64>,
    pub trials: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct BattleResponse<'a> {
    pub status: &'static str,
    pub seed: u64,
    pub battle: &'a BattleState,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse<'a> {
    pub status: &'static str,
    pub summary: &'a MonteCarloSummary,
    /// Normal-approximation 95% interval for the win rate, in percent.
    pub win_rate_95_ci: [f64; 2],
}

#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub status: &'static str,
    pub job_id: String,
    pub trials: usize,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0}")]
    Roster(#[from] RosterError),
    #[error("{0}")]
    Battle(#[from] BattleError),
    #[error("balance configuration unavailable: {0}")]
    Balance(#[from] ConfigError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{running} jobs already running, retry once one finishes")]
    Busy { running: usize },
}

impl From<jobs::JobsBusy> for ApiError {
    fn from(busy: jobs::JobsBusy) -> Self {
        Self::Busy {
            running: busy.running,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> (u16, &'static str) {
        match self {
            Self::Parse(_) | Self::Roster(_) | Self::Validation(_) => (400, "Bad Request"),
            Self::Battle(err) if err.is_configuration() => (400, "Bad Request"),
            Self::NotFound(_) => (404, "Not Found"),
            Self::Busy { .. } => (429, "Too Many Requests"),
            Self::Battle(_) | Self::Balance(_) => (500, "Internal Server Error"),
        }
    }
}

fn shared_catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(load_default_catalog)
}

pub(crate) struct Matchup {
    pub attacker: Formation,
    pub defender: Formation,
    pub config: BalanceConfig,
    pub seed: Option<u64>,
    pub trials: usize,
}

pub(crate) fn resolve_matchup(body: &str) -> Result<Matchup, ApiError> {
    let request: MatchupRequest = serde_json::from_str(body)?;
    let trials = request.trials.unwrap_or(DEFAULT_TRIALS);

    let attacker;
    let defender;
    if request.commanders.is_empty() {
        attacker = request.attacker.resolve(shared_catalog())?;
        defender = request.defender.resolve(shared_catalog())?;
    } else {
        let mut catalog = shared_catalog().clone();
        catalog.extend(request.commanders);
        attacker = request.attacker.resolve(&catalog)?;
        defender = request.defender.resolve(&catalog)?;
    }

    Ok(Matchup {
        attacker,
        defender,
        config: balance_from_env()?,
        seed: request.seed,
        trials: trials.min(MAX_TRIALS),
    })
}

/// Only Monte Carlo requests use `trials`; a single battle ignores it.
fn require_trials(matchup: &Matchup) -> Result<(), ApiError> {
    if matchup.trials == 0 {
        return Err(ApiError::Validation("trials must be at least 1".to_string()));
    }
    Ok(())
}

pub fn health_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "service": "warband-api",
        "version": env!("CARGO_PKG_VERSION"),
        "commanders": shared_catalog().len(),
    }))
}

pub fn commanders_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "commanders": shared_catalog().commanders(),
    }))
}

pub fn battle_payload(body: &str) -> Result<String, ApiError> {
    let matchup = resolve_matchup(body)?;
    let seed = matchup.seed.unwrap_or_else(entropy_seed);
    let state = run_battle(
        &matchup.attacker,
        &matchup.defender,
        &matchup.config,
        &mut Rng::new(seed),
    )?;
    Ok(serde_json::to_string_pretty(&BattleResponse {
        status: "ok",
        seed,
        battle: &state,
    })?)
}

pub(crate) fn binomial_95_ci(wins: usize, n: usize) -> [f64; 2] {
    if n == 0 {
        return [0.0, 0.0];
    }
    let p = wins as f64 / n as f64;
    let z = 1.96;
    let se = (p * (1.0 - p) / n as f64).sqrt();
    let lo = (p - z * se).max(0.0);
    let hi = (p + z * se).min(1.0);
    [lo * 100.0, hi * 100.0]
}

pub fn simulate_payload(body: &str) -> Result<String, ApiError> {
    let matchup = resolve_matchup(body)?;
    require_trials(&matchup)?;
    let summary = run_monte_carlo_parallel(
        &matchup.attacker,
        &matchup.defender,
        &matchup.config,
        matchup.trials,
        matchup.seed,
    )?;
    Ok(serde_json::to_string_pretty(&SimulateResponse {
        status: "ok",
        win_rate_95_ci: binomial_95_ci(summary.wins, summary.completed()),
        summary: &summary,
    })?)
}

pub fn job_submit_payload(body: &str) -> Result<String, ApiError> {
    let matchup = resolve_matchup(body)?;
    require_trials(&matchup)?;
    let trials = matchup.trials;
    let job_id = jobs::submit(matchup)?;
    Ok(serde_json::to_string_pretty(&JobAccepted {
        status: "running",
        job_id,
        trials,
    })?)
}

pub fn job_status_payload(id: &str) -> Result<String, ApiError> {
    let status = jobs::status(id).ok_or_else(|| ApiError::NotFound(format!("job '{id}' not found")))?;
    Ok(serde_json::to_string_pretty(&status)?)
}

pub fn job_cancel_payload(id: &str) -> Result<String, ApiError> {
    let status = jobs::cancel(id).ok_or_else(|| ApiError::NotFound(format!("job '{id}' not found")))?;
    Ok(serde_json::to_string_pretty(&status)?)
}
