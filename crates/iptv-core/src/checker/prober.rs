use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::status::{classify_failure, classify_status, StreamStatus};
use crate::config::CheckerConfig;
use crate::probe::{FailureKind, ProbeAttempt, ProbeClient, ProbeMethod, ProbeOutcome};

/// Checks one endpoint: a HEAD probe, then a ranged GET when the server refuses HEAD.
#[derive(Clone)]
pub struct EndpointProber {
    client: Arc<dyn ProbeClient>,
    config: CheckerConfig,
}

impl EndpointProber {
    pub fn new(client: Arc<dyn ProbeClient>, config: &CheckerConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    /// Probes `url` within `timeout` and returns the verdict with every attempt made.
    /// At most two attempts are made and both share the same deadline.
    pub async fn check(&self, url: &str, timeout: Duration) -> (StreamStatus, Vec<ProbeAttempt>) {
        let started = Instant::now();
        let mut attempts = Vec::with_capacity(2);

        let head = self.attempt(url, ProbeMethod::Head, timeout).await;
        let rejected = head
            .outcome
            .status()
            .is_some_and(|s| self.config.is_fallback_status(s));
        attempts.push(head);

        if rejected {
            let remaining = timeout.saturating_sub(started.elapsed());
            let get = if remaining.is_zero() {
                ProbeAttempt::new(
                    ProbeMethod::Get,
                    ProbeOutcome::failure(FailureKind::Timeout),
                    Duration::ZERO,
                )
            } else {
                debug!(url, remaining_ms = remaining.as_millis() as u64, "HEAD rejected, retrying with GET");
                self.attempt(url, ProbeMethod::Get, remaining).await
            };
            attempts.push(get);
        }

        (resolve(&attempts), attempts)
    }

    async fn attempt(&self, url: &str, method: ProbeMethod, timeout: Duration) -> ProbeAttempt {
        let started = Instant::now();
        let outcome = self.client.probe(url, method, timeout).await;
        ProbeAttempt::new(method, outcome, started.elapsed())
    }
}

/// Derives the verdict from the last attempt; earlier attempts only matter as trail.
fn resolve(attempts: &[ProbeAttempt]) -> StreamStatus {
    let Some(last) = attempts.last() else {
        return StreamStatus::Probed {
            ok: false,
            requests: Vec::new(),
        };
    };

    if last.outcome.is_servable() {
        return StreamStatus::Probed {
            ok: true,
            requests: attempts.to_vec(),
        };
    }

    let named = match &last.outcome {
        ProbeOutcome::Success { status, .. } => classify_status(*status),
        ProbeOutcome::TransportFailure { kind, .. } => classify_failure(*kind),
    };

    match named {
        Some((code, message)) => StreamStatus::classified(code, message),
        None => StreamStatus::Probed {
            ok: false,
            requests: attempts.to_vec(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Answers from a fixed script keyed by method and records what was asked.
    struct ScriptedClient {
        answers: HashMap<ProbeMethod, ProbeOutcome>,
        delay: Duration,
        calls: Mutex<Vec<(ProbeMethod, Duration)>>,
    }

    impl ScriptedClient {
        fn new(answers: &[(ProbeMethod, ProbeOutcome)]) -> Self {
            Self {
                answers: answers.iter().cloned().collect(),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> Vec<(ProbeMethod, Duration)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProbeClient for ScriptedClient {
        async fn probe(&self, _url: &str, method: ProbeMethod, timeout: Duration) -> ProbeOutcome {
            self.calls.lock().unwrap().push((method, timeout));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answers
                .get(&method)
                .cloned()
                .unwrap_or_else(|| panic!("unexpected {} probe", method))
        }
    }

    fn prober(client: Arc<ScriptedClient>) -> EndpointProber {
        EndpointProber::new(client, &CheckerConfig::default())
    }

    const URL: &str = "http://example.com/live.m3u8";

    #[tokio::test]
    async fn head_success_is_ok_without_trail() {
        let client = Arc::new(ScriptedClient::new(&[(
            ProbeMethod::Head,
            ProbeOutcome::success(200, "OK"),
        )]));
        let (status, attempts) = prober(client.clone()).check(URL, Duration::from_secs(2)).await;
        assert!(status.ok());
        assert!(status.requests().is_none());
        assert_eq!(attempts.len(), 1);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn redirect_status_counts_as_servable() {
        let client = Arc::new(ScriptedClient::new(&[(
            ProbeMethod::Head,
            ProbeOutcome::success(302, "Found"),
        )]));
        let (status, _) = prober(client).check(URL, Duration::from_secs(2)).await;
        assert!(status.ok());
    }

    #[tokio::test]
    async fn rejected_head_falls_back_to_get() {
        let client = Arc::new(ScriptedClient::new(&[
            (ProbeMethod::Head, ProbeOutcome::success(405, "Method Not Allowed")),
            (ProbeMethod::Get, ProbeOutcome::success(206, "Partial Content")),
        ]));
        let (status, attempts) = prober(client.clone()).check(URL, Duration::from_secs(2)).await;
        assert!(status.ok());
        let trail = status.requests().expect("fallback success keeps its trail");
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].method, ProbeMethod::Head);
        assert_eq!(trail[0].outcome.status(), Some(405));
        assert_eq!(trail[1].method, ProbeMethod::Get);
        assert_eq!(attempts, trail.to_vec());
    }

    #[tokio::test]
    async fn fallback_failure_is_classified_from_get() {
        let client = Arc::new(ScriptedClient::new(&[
            (ProbeMethod::Head, ProbeOutcome::success(403, "Forbidden")),
            (ProbeMethod::Get, ProbeOutcome::success(403, "Forbidden")),
        ]));
        let (status, attempts) = prober(client).check(URL, Duration::from_secs(2)).await;
        assert_eq!(status, StreamStatus::classified("HTTP_FORBIDDEN", "Forbidden"));
        assert_eq!(attempts.len(), 2);
    }

    #[tokio::test]
    async fn configured_fallback_statuses_replace_defaults() {
        let client = Arc::new(ScriptedClient::new(&[
            (ProbeMethod::Head, ProbeOutcome::success(501, "Not Implemented")),
            (ProbeMethod::Get, ProbeOutcome::success(200, "OK")),
        ]));
        let config = CheckerConfig::default().with_fallback_statuses(vec![501]);
        let (status, attempts) = EndpointProber::new(client, &config)
            .check(URL, Duration::from_secs(2))
            .await;
        assert!(status.ok());
        assert_eq!(attempts.len(), 2);

        let client = Arc::new(ScriptedClient::new(&[(
            ProbeMethod::Head,
            ProbeOutcome::success(405, "Method Not Allowed"),
        )]));
        let (status, attempts) = EndpointProber::new(client.clone(), &config)
            .check(URL, Duration::from_secs(2))
            .await;
        assert_eq!(status.code(), Some("HTTP_METHOD_NOT_ALLOWED"));
        assert_eq!(attempts.len(), 1);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn generic_error_does_not_fall_back() {
        let client = Arc::new(ScriptedClient::new(&[(
            ProbeMethod::Head,
            ProbeOutcome::success(500, "Internal Server Error"),
        )]));
        let (status, attempts) = prober(client.clone()).check(URL, Duration::from_secs(2)).await;
        assert_eq!(status.code(), Some("HTTP_INTERNAL_SERVER_ERROR"));
        assert_eq!(attempts.len(), 1);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_for_legal_reasons() {
        let client = Arc::new(ScriptedClient::new(&[(
            ProbeMethod::Head,
            ProbeOutcome::success(451, "Unavailable For Legal Reasons"),
        )]));
        let (status, _) = prober(client).check(URL, Duration::from_secs(2)).await;
        assert!(!status.ok());
        assert_eq!(status.code(), Some("HTTP_UNAVAILABLE_FOR_LEGAL_REASONS"));
        assert_eq!(status.message(), Some("Unavailable For Legal Reasons"));
        assert!(status.requests().is_none());
    }

    #[tokio::test]
    async fn transport_failures_are_named() {
        for (kind, code) in [
            (FailureKind::Timeout, "HTTP_REQUEST_TIMEOUT"),
            (FailureKind::ConnectionRefused, "HTTP_CONNECTION_REFUSED"),
            (FailureKind::DnsFailure, "HTTP_HOST_NOT_FOUND"),
            (FailureKind::TlsFailure, "HTTP_TLS_HANDSHAKE_FAILED"),
        ] {
            let client = Arc::new(ScriptedClient::new(&[(ProbeMethod::Head, ProbeOutcome::failure(kind))]));
            let (status, _) = prober(client).check(URL, Duration::from_secs(2)).await;
            assert_eq!(status.code(), Some(code), "{:?}", kind);
        }
    }

    #[tokio::test]
    async fn unnamed_failures_keep_trail() {
        let client = Arc::new(ScriptedClient::new(&[(
            ProbeMethod::Head,
            ProbeOutcome::failure(FailureKind::Other),
        )]));
        let (status, _) = prober(client).check(URL, Duration::from_secs(2)).await;
        assert!(!status.ok());
        assert!(status.code().is_none());
        assert_eq!(status.requests().map(|r| r.len()), Some(1));

        let client = Arc::new(ScriptedClient::new(&[(
            ProbeMethod::Head,
            ProbeOutcome::success(599, "Unknown"),
        )]));
        let (status, _) = prober(client).check(URL, Duration::from_secs(2)).await;
        assert!(status.code().is_none());
        assert_eq!(status.requests().map(|r| r.len()), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_uses_remaining_budget() {
        let client = Arc::new(
            ScriptedClient::new(&[
                (ProbeMethod::Head, ProbeOutcome::success(405, "Method Not Allowed")),
                (ProbeMethod::Get, ProbeOutcome::success(200, "OK")),
            ])
            .with_delay(Duration::from_millis(600)),
        );
        let (status, _) = prober(client.clone()).check(URL, Duration::from_millis(2000)).await;
        assert!(status.ok());
        let calls = client.calls();
        assert_eq!(calls[0], (ProbeMethod::Head, Duration::from_millis(2000)));
        assert_eq!(calls[1].0, ProbeMethod::Get);
        assert!(calls[1].1 <= Duration::from_millis(1400));
    }

    #[tokio::test(start_paused = true)]
    async fn spent_budget_records_timeout_without_second_call() {
        let client = Arc::new(
            ScriptedClient::new(&[(ProbeMethod::Head, ProbeOutcome::success(405, "Method Not Allowed"))])
                .with_delay(Duration::from_millis(500)),
        );
        let (status, attempts) = prober(client.clone()).check(URL, Duration::from_millis(500)).await;
        assert_eq!(status.code(), Some("HTTP_REQUEST_TIMEOUT"));
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1].outcome, ProbeOutcome::failure(FailureKind::Timeout));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn repeated_checks_are_independent() {
        let client = Arc::new(ScriptedClient::new(&[(
            ProbeMethod::Head,
            ProbeOutcome::success(200, "OK"),
        )]));
        let prober = prober(client);
        let (first, _) = prober.check(URL, Duration::from_secs(1)).await;
        let (second, _) = prober.check(URL, Duration::from_secs(1)).await;
        assert!(first.ok());
        assert!(second.ok());
    }
}
