//! Background Monte Carlo jobs for the HTTP server.
//!
//! A job runs on its own thread and reports through a shared [Progress]. The registry is the only
//! shared mutable state in the service; it holds progress handles and finished summaries, never
//! battle state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::parallel::Progress;
use crate::server::api::Matchup;
use crate::simulation::{run_monte_carlo_with_progress, MonteCarloSummary};

/// Finished jobs kept for polling; the oldest are evicted first.
const MAX_FINISHED_JOBS: usize = 64;

/// Jobs whose worker thread is still alive, cancelled ones included.
pub const MAX_RUNNING_JOBS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobsBusy {
    pub running: usize,
}

#[derive(Debug, Clone)]
enum JobOutcome {
    Running,
    Done(MonteCarloSummary),
    Failed(String),
}

#[derive(Debug)]
struct JobEntry {
    progress: Arc<Progress>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    outcome: JobOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub job_id: String,
    /// `running`, `done`, `cancelled` or `failed`.
    pub status: &'static str,
    pub completed: usize,
    pub total: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<MonteCarloSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn registry() -> MutexGuard<'static, HashMap<String, JobEntry>> {
    static JOBS: OnceLock<Mutex<HashMap<String, JobEntry>>> = OnceLock::new();
    JOBS.get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn describe(id: &str, entry: &JobEntry) -> JobStatus {
    let snapshot = entry.progress.snapshot();
    let (status, summary, error) = match &entry.outcome {
        JobOutcome::Failed(reason) => ("failed", None, Some(reason.clone())),
        _ if snapshot.cancelled => match &entry.outcome {
            JobOutcome::Done(summary) => ("cancelled", Some(summary.clone()), None),
            _ => ("cancelled", None, None),
        },
        JobOutcome::Running => ("running", None, None),
        JobOutcome::Done(summary) => ("done", Some(summary.clone()), None),
    };
    JobStatus {
        job_id: id.to_string(),
        status,
        completed: snapshot.completed,
        total: snapshot.total,
        started_at: entry.started_at,
        finished_at: entry.finished_at,
        summary,
        error,
    }
}

fn evict_finished(jobs: &mut HashMap<String, JobEntry>) {
    let mut finished: Vec<(DateTime<Utc>, String)> = jobs
        .iter()
        .filter_map(|(id, entry)| entry.finished_at.map(|at| (at, id.clone())))
        .collect();
    if finished.len() <= MAX_FINISHED_JOBS {
        return;
    }
    finished.sort();
    let excess = finished.len() - MAX_FINISHED_JOBS;
    for (_, id) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
}

fn running_jobs(jobs: &HashMap<String, JobEntry>) -> usize {
    jobs.values()
        .filter(|entry| matches!(entry.outcome, JobOutcome::Running))
        .count()
}

/// Start a job and return its id immediately, unless [MAX_RUNNING_JOBS] are already running.
pub(crate) fn submit(matchup: Matchup) -> Result<String, JobsBusy> {
    let id = Uuid::new_v4().to_string();
    let progress = Arc::new(Progress::new(matchup.trials));
    {
        let mut jobs = registry();
        let running = running_jobs(&jobs);
        if running >= MAX_RUNNING_JOBS {
            tracing::warn!(running, "monte carlo job rejected, too many running");
            return Err(JobsBusy { running });
        }
        jobs.insert(
            id.clone(),
            JobEntry {
                progress: Arc::clone(&progress),
                started_at: Utc::now(),
                finished_at: None,
                outcome: JobOutcome::Running,
            },
        );
    }
    tracing::info!(job_id = %id, trials = matchup.trials, "monte carlo job started");

    let job_id = id.clone();
    thread::spawn(move || {
        let result = run_monte_carlo_with_progress(
            &matchup.attacker,
            &matchup.defender,
            &matchup.config,
            matchup.trials,
            matchup.seed,
            true,
            &progress,
        );
        let outcome = match result {
            Ok(summary) => JobOutcome::Done(summary),
            Err(err) => JobOutcome::Failed(err.to_string()),
        };
        let mut jobs = registry();
        if let Some(entry) = jobs.get_mut(&job_id) {
            entry.outcome = outcome;
            entry.finished_at = Some(Utc::now());
            tracing::info!(job_id = %job_id, status = describe(&job_id, entry).status, "monte carlo job finished");
        }
        evict_finished(&mut jobs);
    });
    Ok(id)
}

pub fn status(id: &str) -> Option<JobStatus> {
    registry().get(id).map(|entry| describe(id, entry))
}

/// Request cancellation. Trials already underway finish; no new trial starts.
pub fn cancel(id: &str) -> Option<JobStatus> {
    let jobs = registry();
    let entry = jobs.get(id)?;
    if matches!(entry.outcome, JobOutcome::Running) {
        entry.progress.cancel();
        tracing::info!(job_id = %id, "monte carlo job cancellation requested");
    }
    Some(describe(id, entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(outcome: JobOutcome, finished: bool) -> JobEntry {
        JobEntry {
            progress: Arc::new(Progress::new(10)),
            started_at: Utc::now(),
            finished_at: finished.then(Utc::now),
            outcome,
        }
    }

    #[test]
    fn running_job_reports_progress() {
        let job = entry(JobOutcome::Running, false);
        job.progress.record_completed();
        let status = describe("a", &job);
        assert_eq!(status.status, "running");
        assert_eq!((status.completed, status.total), (1, 10));
        assert!(status.summary.is_none());
    }

    #[test]
    fn cancelled_flag_wins_over_running() {
        let job = entry(JobOutcome::Running, false);
        job.progress.cancel();
        assert_eq!(describe("a", &job).status, "cancelled");
    }

    #[test]
    fn failure_carries_reason() {
        let status = describe("a", &entry(JobOutcome::Failed("boom".to_string()), true));
        assert_eq!(status.status, "failed");
        assert_eq!(status.error.as_deref(), Some("boom"));
    }

    #[test]
    fn eviction_keeps_running_jobs() {
        let mut jobs = HashMap::new();
        jobs.insert("live".to_string(), entry(JobOutcome::Running, false));
        for i in 0..MAX_FINISHED_JOBS + 5 {
            jobs.insert(format!("done-{i}"), entry(JobOutcome::Failed(String::new()), true));
        }
        evict_finished(&mut jobs);
        assert_eq!(jobs.len(), MAX_FINISHED_JOBS + 1);
        assert!(jobs.contains_key("live"));
    }

    #[test]
    fn only_unfinished_jobs_count_as_running() {
        let mut jobs = HashMap::new();
        for i in 0..3 {
            jobs.insert(format!("live-{i}"), entry(JobOutcome::Running, false));
        }
        let cancelled = entry(JobOutcome::Running, false);
        cancelled.progress.cancel();
        jobs.insert("cancelled".to_string(), cancelled);
        jobs.insert("failed".to_string(), entry(JobOutcome::Failed(String::new()), true));
        assert_eq!(running_jobs(&jobs), 4);
    }

    #[test]
    fn unknown_job_is_absent() {
        assert!(status("no-such-job").is_none());
        assert!(cancel("no-such-job").is_none());
    }
}
