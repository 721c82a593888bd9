use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use iptv_core::{CheckError, Report, StreamStatus};

use crate::state::{AppState, JobState};

/// Label used for offline endpoints the status taxonomy has no name for.
const UNCLASSIFIED: &str = "UNCLASSIFIED";

/// Process-lifetime counters for checks served by the API.
#[derive(Debug)]
pub struct Metrics {
    started_at: DateTime<Utc>,
    stream_checks: AtomicU64,
    playlist_checks: AtomicU64,
    endpoints_online: AtomicU64,
    endpoints_offline: AtomicU64,
    failure_codes: DashMap<String, u64>,
    playlist_errors: DashMap<&'static str, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            stream_checks: AtomicU64::new(0),
            playlist_checks: AtomicU64::new(0),
            endpoints_online: AtomicU64::new(0),
            endpoints_offline: AtomicU64::new(0),
            failure_codes: DashMap::new(),
            playlist_errors: DashMap::new(),
        }
    }

    pub fn record_stream(&self, status: &StreamStatus) {
        self.stream_checks.fetch_add(1, Ordering::Relaxed);
        self.record_status(status);
    }

    pub fn record_report(&self, report: &Report) {
        self.playlist_checks.fetch_add(1, Ordering::Relaxed);
        for item in &report.items {
            self.record_status(&item.status);
        }
    }

    pub fn record_playlist_error(&self, error: &CheckError) {
        self.playlist_checks.fetch_add(1, Ordering::Relaxed);
        *self.playlist_errors.entry(error.kind()).or_insert(0) += 1;
    }

    fn record_status(&self, status: &StreamStatus) {
        if status.ok() {
            self.endpoints_online.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.endpoints_offline.fetch_add(1, Ordering::Relaxed);
        let code = status.code().unwrap_or(UNCLASSIFIED).to_string();
        *self.failure_codes.entry(code).or_insert(0) += 1;
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let m = &state.metrics;
    let mut out = String::with_capacity(2048);

    writeln!(out, "# TYPE iptv_checker_checks counter").unwrap();
    writeln!(out, "# HELP iptv_checker_checks Check requests served, by kind").unwrap();
    writeln!(
        out,
        "iptv_checker_checks_total{{kind=\"stream\"}} {}",
        m.stream_checks.load(Ordering::Relaxed)
    )
    .unwrap();
    writeln!(
        out,
        "iptv_checker_checks_total{{kind=\"playlist\"}} {}",
        m.playlist_checks.load(Ordering::Relaxed)
    )
    .unwrap();

    writeln!(out, "# TYPE iptv_checker_playlist_errors counter").unwrap();
    writeln!(
        out,
        "# HELP iptv_checker_playlist_errors Playlist checks rejected before probing"
    )
    .unwrap();
    let errors: BTreeMap<&str, u64> = m.playlist_errors.iter().map(|e| (*e.key(), *e.value())).collect();
    for (kind, count) in &errors {
        writeln!(out, "iptv_checker_playlist_errors_total{{error=\"{}\"}} {}", kind, count).unwrap();
    }

    writeln!(out, "# TYPE iptv_checker_endpoints counter").unwrap();
    writeln!(out, "# HELP iptv_checker_endpoints Endpoints probed, by outcome").unwrap();
    writeln!(
        out,
        "iptv_checker_endpoints_total{{result=\"online\"}} {}",
        m.endpoints_online.load(Ordering::Relaxed)
    )
    .unwrap();
    writeln!(
        out,
        "iptv_checker_endpoints_total{{result=\"offline\"}} {}",
        m.endpoints_offline.load(Ordering::Relaxed)
    )
    .unwrap();

    writeln!(out, "# TYPE iptv_checker_endpoint_failures counter").unwrap();
    writeln!(
        out,
        "# HELP iptv_checker_endpoint_failures Offline endpoints by status code"
    )
    .unwrap();
    let codes: BTreeMap<String, u64> = m
        .failure_codes
        .iter()
        .map(|e| (e.key().clone(), *e.value()))
        .collect();
    for (code, count) in &codes {
        writeln!(out, "iptv_checker_endpoint_failures_total{{code=\"{}\"}} {}", code, count).unwrap();
    }

    writeln!(out, "# TYPE iptv_checker_jobs gauge").unwrap();
    writeln!(out, "# HELP iptv_checker_jobs Background playlist jobs held in memory, by state").unwrap();
    for job_state in [JobState::Running, JobState::Completed, JobState::Failed] {
        let count = state.jobs.iter().filter(|j| j.state == job_state).count();
        writeln!(out, "iptv_checker_jobs{{state=\"{}\"}} {}", job_state, count).unwrap();
    }

    writeln!(out, "# TYPE iptv_checker_uptime_seconds gauge").unwrap();
    writeln!(out, "# HELP iptv_checker_uptime_seconds Time since the server started").unwrap();
    let uptime = (Utc::now() - m.started_at).num_milliseconds() as f64 / 1000.0;
    writeln!(out, "iptv_checker_uptime_seconds {:.3}", uptime).unwrap();

    writeln!(out, "# EOF").unwrap();

    (
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        out,
    )
}
