use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Status codes that signal a server refused the HEAD method rather than the resource.
pub const DEFAULT_FALLBACK_STATUSES: &[u16] = &[403, 405];

/// Configuration for a checker instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Per-endpoint deadline covering every attempt made for that endpoint (default: 60s).
    pub timeout: Duration,
    /// Number of endpoints probed at the same time (default: 1).
    pub parallel: usize,
    /// Sent as `User-Agent` on playlist fetches and probes.
    pub user_agent: Option<String>,
    /// Sent as `Referer` on probes. Some IPTV origins refuse requests without one.
    pub http_referer: Option<String>,
    /// Accept invalid TLS certificates.
    pub insecure: bool,
    /// HEAD responses with one of these statuses are retried with a ranged GET.
    pub fallback_statuses: Vec<u16>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(60_000),
            parallel: 1,
            user_agent: None,
            http_referer: None,
            insecure: false,
            fallback_statuses: DEFAULT_FALLBACK_STATUSES.to_vec(),
        }
    }
}

impl CheckerConfig {
    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms.max(1));
        self
    }

    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_http_referer(mut self, referer: impl Into<String>) -> Self {
        self.http_referer = Some(referer.into());
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_fallback_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.fallback_statuses = statuses;
        self
    }

    pub fn is_fallback_status(&self, status: u16) -> bool {
        self.fallback_statuses.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CheckerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.parallel, 1);
        assert!(!config.insecure);
        assert!(config.is_fallback_status(405));
        assert!(config.is_fallback_status(403));
        assert!(!config.is_fallback_status(404));
    }

    #[test]
    fn parallel_is_clamped_to_one() {
        let config = CheckerConfig::default().with_parallel(0);
        assert_eq!(config.parallel, 1);
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let config = CheckerConfig::default().with_timeout(0);
        assert_eq!(config.timeout, Duration::from_millis(1));
    }

    #[test]
    fn fallback_statuses_are_replaceable() {
        let config = CheckerConfig::default().with_fallback_statuses(vec![501]);
        assert!(config.is_fallback_status(501));
        assert!(!config.is_fallback_status(405));
    }
}
