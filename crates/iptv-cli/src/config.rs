//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//! allow_local_paths = false
//! max_finished_jobs = 100
//!
//! [checker]
//! timeout_ms = 10000
//! parallel = 8
//! user_agent = "VLC/3.0.20 LibVLC/3.0.20"
//! http_referer = "https://portal.example.com/"
//! insecure = false
//! fallback_statuses = [403, 405, 501]
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use iptv_core::CheckerConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub checker: CheckerSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Lets API callers name playlist files on this host.
    #[serde(default)]
    pub allow_local_paths: bool,

    /// Completed and failed API jobs kept in memory.
    #[serde(default = "default_max_finished_jobs")]
    pub max_finished_jobs: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: default_log_format(),
            allow_local_paths: false,
            max_finished_jobs: default_max_finished_jobs(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_log_format() -> String {
    "pretty".into()
}

fn default_max_finished_jobs() -> usize {
    iptv_api::state::DEFAULT_MAX_FINISHED_JOBS
}

/// Checker settings. Unset fields keep the library defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckerSection {
    pub timeout_ms: Option<u64>,
    pub parallel: Option<usize>,
    pub user_agent: Option<String>,
    pub http_referer: Option<String>,
    pub insecure: Option<bool>,
    pub fallback_statuses: Option<Vec<u16>>,
}

impl CheckerSection {
    pub fn to_checker_config(&self) -> CheckerConfig {
        let mut c = CheckerConfig::default();
        if let Some(ms) = self.timeout_ms {
            c = c.with_timeout(ms);
        }
        if let Some(p) = self.parallel {
            c = c.with_parallel(p);
        }
        if let Some(ref ua) = self.user_agent {
            c = c.with_user_agent(ua);
        }
        if let Some(ref referer) = self.http_referer {
            c = c.with_http_referer(referer);
        }
        if let Some(insecure) = self.insecure {
            c = c.with_insecure(insecure);
        }
        if let Some(ref statuses) = self.fallback_statuses {
            c = c.with_fallback_statuses(statuses.clone());
        }
        c
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        match self.server.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        if self.server.max_finished_jobs == 0 {
            return Err("server.max_finished_jobs must be at least 1".into());
        }

        let checker = &self.checker;
        if checker.timeout_ms == Some(0) {
            return Err("checker.timeout_ms must be greater than 0".into());
        }
        if checker.parallel == Some(0) {
            return Err("checker.parallel must be at least 1".into());
        }
        if let Some(ref statuses) = checker.fallback_statuses {
            if let Some(bad) = statuses.iter().find(|s| !(100..=599).contains(*s)) {
                return Err(format!(
                    "Invalid fallback status {}: must be between 100 and 599",
                    bad
                ));
            }
        }
        for (name, value) in [
            ("user_agent", &checker.user_agent),
            ("http_referer", &checker.http_referer),
        ] {
            let Some(value) = value.as_deref() else {
                continue;
            };
            if value.trim().is_empty() {
                return Err(format!("checker.{} must not be empty", name));
            }
            if value.chars().any(char::is_control) {
                return Err(format!(
                    "checker.{} must not contain control characters",
                    name
                ));
            }
        }

        Ok(())
    }
}
