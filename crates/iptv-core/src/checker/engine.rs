use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::prober::EndpointProber;
use super::report::{to_report, Report};
use super::scheduler::{run_all, Progress};
use super::status::StreamStatus;
use crate::config::CheckerConfig;
use crate::error::CheckError;
use crate::playlist::{Entry, PlaylistInput, PlaylistResolver};
use crate::probe::{HttpProbeClient, ProbeClient};

/// Per-call overrides of the checker configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    pub timeout: Option<Duration>,
    pub parallel: Option<usize>,
}

impl CheckOptions {
    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(ms.max(1)));
        self
    }

    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = Some(parallel.max(1));
        self
    }
}

/// A single-endpoint check.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub url: String,
    pub timeout: Option<Duration>,
}

impl StreamRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(ms.max(1)));
        self
    }
}

/// Resolves playlists, probes their entries and assembles reports.
pub struct PlaylistChecker {
    config: CheckerConfig,
    prober: EndpointProber,
    resolver: PlaylistResolver,
}

impl PlaylistChecker {
    pub fn new(config: CheckerConfig) -> Self {
        let http = HttpProbeClient::new(&config);
        let resolver = PlaylistResolver::new(http.client().clone(), config.timeout);
        Self {
            prober: EndpointProber::new(Arc::new(http), &config),
            resolver,
            config,
        }
    }

    /// Uses `client` for probes; playlists are still fetched over HTTP.
    pub fn with_probe_client(config: CheckerConfig, client: Arc<dyn ProbeClient>) -> Self {
        let resolver =
            PlaylistResolver::new(HttpProbeClient::build_client(&config), config.timeout);
        Self {
            prober: EndpointProber::new(client, &config),
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub async fn check_playlist(
        &self,
        input: impl Into<PlaylistInput>,
        options: CheckOptions,
    ) -> Result<Report, CheckError> {
        self.run_playlist(input.into(), options, None).await
    }

    /// Like [`PlaylistChecker::check_playlist`], reporting each finished entry to `progress`.
    pub async fn check_playlist_with_progress(
        &self,
        input: impl Into<PlaylistInput>,
        options: CheckOptions,
        progress: Progress<'_, StreamStatus>,
    ) -> Result<Report, CheckError> {
        self.run_playlist(input.into(), options, Some(progress)).await
    }

    /// Resolves and parses a playlist without probing anything.
    pub async fn load_entries(&self, input: &PlaylistInput) -> Result<Vec<Entry>, CheckError> {
        let content = self.resolver.resolve(input).await.inspect_err(|e| {
            warn!(input = input.kind(), error = %e, "Could not resolve playlist");
        })?;
        content.parse().inspect_err(|e| {
            warn!(input = input.kind(), error = %e, "Could not parse playlist");
        })
    }

    /// Probes already parsed entries.
    pub async fn check_entries(
        &self,
        entries: Vec<Entry>,
        options: CheckOptions,
        progress: Option<Progress<'_, StreamStatus>>,
    ) -> Report {
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let parallel = options.parallel.unwrap_or(self.config.parallel).max(1);
        let started_at = Utc::now();
        let started = Instant::now();

        info!(entries = entries.len(), parallel, timeout_ms = timeout.as_millis() as u64, "Checking playlist");

        let statuses = run_all(
            &entries,
            parallel,
            |index, entry| async move {
                let (status, attempts) = self.prober.check(&entry.url, timeout).await;
                debug!(index, url = %entry.url, ok = status.ok(), attempts = attempts.len(), "Entry checked");
                status
            },
            progress,
        )
        .await;

        let report = to_report(entries, statuses, started_at, started.elapsed());
        let summary = report.summary();
        info!(
            report_id = %report.id,
            total = summary.total,
            online = summary.online,
            offline = summary.offline,
            duration_ms = report.duration_ms,
            "Playlist check finished"
        );
        report
    }

    /// Probes one endpoint. Never fails: unreachable endpoints are a status.
    pub async fn check_stream(&self, request: StreamRequest) -> StreamStatus {
        let timeout = request.timeout.unwrap_or(self.config.timeout);
        let (status, attempts) = self.prober.check(&request.url, timeout).await;
        info!(url = %request.url, ok = status.ok(), code = status.code().unwrap_or(""), attempts = attempts.len(), "Stream checked");
        status
    }

    async fn run_playlist(
        &self,
        input: PlaylistInput,
        options: CheckOptions,
        progress: Option<Progress<'_, StreamStatus>>,
    ) -> Result<Report, CheckError> {
        let entries = self.load_entries(&input).await?;
        Ok(self.check_entries(entries, options, progress).await)
    }
}
