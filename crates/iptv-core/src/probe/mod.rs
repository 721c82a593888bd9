mod http;

pub use http::HttpProbeClient;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    /// Header-only request.
    Head,
    /// Ranged request for the first byte of the stream.
    Get,
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "HEAD"),
            Self::Get => write!(f, "GET"),
        }
    }
}

/// Why no HTTP response was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    ConnectionRefused,
    DnsFailure,
    TlsFailure,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::DnsFailure => write!(f, "dns failure"),
            Self::TlsFailure => write!(f, "tls failure"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Normalized result of a single request. Any HTTP status, including 4xx and 5xx,
/// is a `Success`: the server answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Success {
        status: u16,
        status_text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    TransportFailure {
        kind: FailureKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl ProbeOutcome {
    pub fn success(status: u16, status_text: impl Into<String>) -> Self {
        Self::Success {
            status,
            status_text: status_text.into(),
            content_type: None,
        }
    }

    pub fn failure(kind: FailureKind) -> Self {
        Self::TransportFailure { kind, reason: None }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success { status, .. } => Some(*status),
            Self::TransportFailure { .. } => None,
        }
    }

    /// 2xx and 3xx answers mean the endpoint is servable.
    pub fn is_servable(&self) -> bool {
        matches!(self.status(), Some(200..=399))
    }
}

/// One network call made while checking an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeAttempt {
    pub method: ProbeMethod,
    pub outcome: ProbeOutcome,
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
}

impl ProbeAttempt {
    pub fn new(method: ProbeMethod, outcome: ProbeOutcome, elapsed: Duration) -> Self {
        Self {
            method,
            outcome,
            elapsed,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Issues a single request and reports what happened.
///
/// Implementations never fail: every error is folded into a `ProbeOutcome`.
/// A probe must not outlive `timeout`.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn probe(&self, url: &str, method: ProbeMethod, timeout: Duration) -> ProbeOutcome;
}
