use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RANGE, REFERER};
use reqwest::Client;
use tracing::{debug, warn};

use super::{FailureKind, ProbeClient, ProbeMethod, ProbeOutcome};
use crate::config::CheckerConfig;

const DEFAULT_USER_AGENT: &str = concat!("iptv-checker/", env!("CARGO_PKG_VERSION"));

/// Probe client backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpProbeClient {
    client: Client,
}

impl HttpProbeClient {
    pub fn new(config: &CheckerConfig) -> Self {
        Self {
            client: Self::build_client(config),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Builds the shared client. Deadlines are set per request, so the client itself has none.
    pub fn build_client(config: &CheckerConfig) -> Client {
        let mut headers = HeaderMap::new();
        if let Some(referer) = config.http_referer.as_deref() {
            match HeaderValue::from_str(referer) {
                Ok(value) => {
                    headers.insert(REFERER, value);
                }
                Err(_) => warn!(referer, "Ignoring invalid Referer header value"),
            }
        }

        let user_agent = match config.user_agent.as_deref() {
            Some(ua) if HeaderValue::from_str(ua).is_ok() => ua,
            Some(ua) => {
                warn!(user_agent = ua, "Ignoring invalid User-Agent header value");
                DEFAULT_USER_AGENT
            }
            None => DEFAULT_USER_AGENT,
        };

        Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure)
            .pool_max_idle_per_host(config.parallel.max(1))
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client")
    }

    async fn send(&self, url: &str, method: ProbeMethod, timeout: Duration) -> ProbeOutcome {
        let request = match method {
            ProbeMethod::Head => self.client.head(url),
            ProbeMethod::Get => self.client.get(url).header(RANGE, "bytes=0-0"),
        }
        .timeout(timeout);

        match request.send().await {
            // The body is never read; dropping the response releases the connection.
            Ok(response) => {
                let status = response.status();
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                ProbeOutcome::Success {
                    status: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
                    content_type,
                }
            }
            Err(e) => ProbeOutcome::TransportFailure {
                kind: classify_error(&e),
                reason: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    async fn probe(&self, url: &str, method: ProbeMethod, timeout: Duration) -> ProbeOutcome {
        // reqwest enforces the deadline too; the outer guard also covers DNS stalls.
        let outcome = match tokio::time::timeout(timeout, self.send(url, method, timeout)).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::failure(FailureKind::Timeout),
        };
        match &outcome {
            ProbeOutcome::Success { status, .. } => {
                debug!(url, %method, status, "Probe answered");
            }
            ProbeOutcome::TransportFailure { kind, reason } => {
                debug!(url, %method, %kind, reason = reason.as_deref().unwrap_or(""), "Probe failed");
            }
        }
        outcome
    }
}

/// Walks the error source chain to find out why no response arrived.
pub(crate) fn classify_error(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        return FailureKind::Timeout;
    }

    // The top-level message embeds the URL, so only the causes are inspected.
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return FailureKind::ConnectionRefused,
                io::ErrorKind::TimedOut => return FailureKind::Timeout,
                _ => {}
            }
        }
        if let Some(kind) = classify_message(&e.to_string()) {
            return kind;
        }
        source = e.source();
    }

    FailureKind::Other
}

fn classify_message(message: &str) -> Option<FailureKind> {
    let message = message.to_ascii_lowercase();
    if message.contains("connection refused") {
        Some(FailureKind::ConnectionRefused)
    } else if message.contains("dns error")
        || message.contains("failed to lookup address")
        || message.contains("name or service not known")
        || message.contains("no such host")
    {
        Some(FailureKind::DnsFailure)
    } else if message.contains("certificate")
        || message.contains("tls")
        || message.contains("ssl")
        || message.contains("handshake")
    {
        Some(FailureKind::TlsFailure)
    } else if message.contains("timed out") {
        Some(FailureKind::Timeout)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpProbeClient {
        HttpProbeClient::new(&CheckerConfig::default())
    }

    #[tokio::test]
    async fn head_returns_status_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/live.m3u8"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "application/vnd.apple.mpegurl"),
            )
            .mount(&server)
            .await;

        let outcome = client()
            .probe(&format!("{}/live.m3u8", server.uri()), ProbeMethod::Head, Duration::from_secs(5))
            .await;
        match outcome {
            ProbeOutcome::Success { status, status_text, content_type } => {
                assert_eq!(status, 200);
                assert_eq!(status_text, "OK");
                assert_eq!(content_type.as_deref(), Some("application/vnd.apple.mpegurl"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn error_statuses_are_successful_outcomes() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(451))
            .mount(&server)
            .await;

        let outcome = client()
            .probe(&format!("{}/blocked", server.uri()), ProbeMethod::Head, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.status(), Some(451));
        assert!(!outcome.is_servable());
    }

    #[tokio::test]
    async fn get_sends_range_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("range", "bytes=0-0"))
            .respond_with(ResponseTemplate::new(206))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client()
            .probe(&format!("{}/stream.ts", server.uri()), ProbeMethod::Get, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.status(), Some(206));
        assert!(outcome.is_servable());
    }

    #[tokio::test]
    async fn custom_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(header("user-agent", "VLC/3.0"))
            .and(header("referer", "https://example.com/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let config = CheckerConfig::default()
            .with_user_agent("VLC/3.0")
            .with_http_referer("https://example.com/");
        let outcome = HttpProbeClient::new(&config)
            .probe(&server.uri(), ProbeMethod::Head, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.status(), Some(200));
    }

    #[tokio::test]
    async fn invalid_user_agent_falls_back_to_default() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let config = CheckerConfig::default().with_user_agent("VLC\n3.0");
        let outcome = HttpProbeClient::new(&config)
            .probe(&server.uri(), ProbeMethod::Head, Duration::from_secs(5))
            .await;
        assert_eq!(outcome.status(), Some(200));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let outcome = client()
            .probe(&server.uri(), ProbeMethod::Head, Duration::from_millis(200))
            .await;
        assert!(started.elapsed() < Duration::from_secs(2));
        match outcome {
            ProbeOutcome::TransportFailure { kind, .. } => assert_eq!(kind, FailureKind::Timeout),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn closed_port_is_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = client()
            .probe(&format!("http://{}/", addr), ProbeMethod::Head, Duration::from_secs(5))
            .await;
        match outcome {
            ProbeOutcome::TransportFailure { kind, .. } => {
                assert_eq!(kind, FailureKind::ConnectionRefused)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn messages_are_classified() {
        assert_eq!(
            classify_message("dns error: failed to lookup address information"),
            Some(FailureKind::DnsFailure)
        );
        assert_eq!(
            classify_message("invalid peer certificate: UnknownIssuer"),
            Some(FailureKind::TlsFailure)
        );
        assert_eq!(
            classify_message("tcp connect error: Connection refused (os error 111)"),
            Some(FailureKind::ConnectionRefused)
        );
        assert_eq!(classify_message("connection reset by peer"), None);
    }
}
