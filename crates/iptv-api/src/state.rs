use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::AbortHandle;
use uuid::Uuid;

use iptv_core::{CheckerConfig, PlaylistChecker, Report};

use crate::metrics::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A playlist check running in the background. Jobs live in memory only.
#[derive(Debug)]
pub struct Job {
    pub id: Uuid,
    pub input_kind: &'static str,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<Arc<Report>>,
    pub error: Option<String>,
    pub abort: Option<AbortHandle>,
}

impl Job {
    pub fn new(input_kind: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_kind,
            state: JobState::Running,
            created_at: Utc::now(),
            finished_at: None,
            report: None,
            error: None,
            abort: None,
        }
    }

    pub fn complete(&mut self, report: Report) {
        self.state = JobState::Completed;
        self.finished_at = Some(Utc::now());
        self.report = Some(Arc::new(report));
        self.abort = None;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = JobState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error.into());
        self.abort = None;
    }
}

/// Finished jobs kept in memory before the oldest are dropped.
pub const DEFAULT_MAX_FINISHED_JOBS: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub checker: Arc<PlaylistChecker>,
    pub jobs: Arc<DashMap<Uuid, Job>>,
    pub metrics: Arc<Metrics>,
    /// Whether API callers may name files on the server's filesystem as playlist input.
    pub allow_local_paths: bool,
    /// Completed and failed jobs beyond this count are evicted, oldest first.
    pub max_finished_jobs: usize,
}

impl AppState {
    pub fn new(config: CheckerConfig) -> Self {
        Self::with_checker(PlaylistChecker::new(config))
    }

    pub fn with_checker(checker: PlaylistChecker) -> Self {
        Self {
            checker: Arc::new(checker),
            jobs: Arc::new(DashMap::new()),
            metrics: Arc::new(Metrics::new()),
            allow_local_paths: false,
            max_finished_jobs: DEFAULT_MAX_FINISHED_JOBS,
        }
    }

    pub fn with_local_paths(mut self, allow: bool) -> Self {
        self.allow_local_paths = allow;
        self
    }

    pub fn with_max_finished_jobs(mut self, max: usize) -> Self {
        self.max_finished_jobs = max.max(1);
        self
    }

    /// Drops the oldest finished jobs so at most `max_finished_jobs` remain.
    /// Running jobs are never evicted.
    pub fn prune_finished_jobs(&self) -> usize {
        let mut finished: Vec<(DateTime<Utc>, Uuid)> = self
            .jobs
            .iter()
            .filter_map(|j| j.finished_at.map(|t| (t, j.id)))
            .collect();
        if finished.len() <= self.max_finished_jobs {
            return 0;
        }

        finished.sort();
        let excess = finished.len() - self.max_finished_jobs;
        for (_, id) in &finished[..excess] {
            self.jobs.remove(id);
        }
        excess
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CheckerConfig::default())
    }
}
