use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::probe::{FailureKind, ProbeAttempt};

/// Final verdict for one endpoint.
///
/// A `Classified` failure names its cause and drops the attempt trail. A `Probed`
/// status keeps the trail; it is either a success or a failure the taxonomy has no
/// name for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Classified { code: String, message: String },
    Probed { ok: bool, requests: Vec<ProbeAttempt> },
}

impl StreamStatus {
    pub fn classified(code: &str, message: &str) -> Self {
        Self::Classified {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn ok(&self) -> bool {
        match self {
            Self::Classified { .. } => false,
            Self::Probed { ok, .. } => *ok,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Classified { code, .. } => Some(code),
            Self::Probed { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Classified { message, .. } => Some(message),
            Self::Probed { .. } => None,
        }
    }

    /// The attempt trail as reported: absent for classified failures and for
    /// successes that took a single attempt.
    pub fn requests(&self) -> Option<&[ProbeAttempt]> {
        match self {
            Self::Probed { ok: true, requests } if requests.len() == 1 => None,
            Self::Probed { requests, .. } => Some(requests),
            Self::Classified { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct StatusRepr<'a> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<MetadataRepr<'a>>,
}

#[derive(Serialize)]
struct MetadataRepr<'a> {
    requests: &'a [ProbeAttempt],
}

impl Serialize for StreamStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StatusRepr {
            ok: self.ok(),
            code: self.code(),
            message: self.message(),
            metadata: self.requests().map(|requests| MetadataRepr { requests }),
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
struct OwnedStatusRepr {
    ok: bool,
    code: Option<String>,
    message: Option<String>,
    metadata: Option<OwnedMetadataRepr>,
}

#[derive(Deserialize)]
struct OwnedMetadataRepr {
    requests: Vec<ProbeAttempt>,
}

impl<'de> Deserialize<'de> for StreamStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = OwnedStatusRepr::deserialize(deserializer)?;
        match (repr.code, repr.message, repr.metadata) {
            (Some(code), Some(message), None) if !repr.ok => {
                Ok(Self::Classified { code, message })
            }
            (None, None, metadata) => Ok(Self::Probed {
                ok: repr.ok,
                requests: metadata.map(|m| m.requests).unwrap_or_default(),
            }),
            _ => Err(serde::de::Error::custom(
                "status must carry either code and message or metadata",
            )),
        }
    }
}

/// Named cause for an HTTP status the server answered with.
pub fn classify_status(status: u16) -> Option<(&'static str, &'static str)> {
    STATUS_TABLE
        .iter()
        .find(|(s, _, _)| *s == status)
        .map(|(_, code, message)| (*code, *message))
}

/// Named cause for a request that never got an answer.
pub fn classify_failure(kind: FailureKind) -> Option<(&'static str, &'static str)> {
    match kind {
        FailureKind::Timeout => Some(("HTTP_REQUEST_TIMEOUT", "Request Timeout")),
        FailureKind::ConnectionRefused => Some(("HTTP_CONNECTION_REFUSED", "Connection Refused")),
        FailureKind::DnsFailure => Some(("HTTP_HOST_NOT_FOUND", "Host Not Found")),
        FailureKind::TlsFailure => Some(("HTTP_TLS_HANDSHAKE_FAILED", "TLS Handshake Failed")),
        FailureKind::Other => None,
    }
}

const STATUS_TABLE: &[(u16, &str, &str)] = &[
    (400, "HTTP_BAD_REQUEST", "Bad Request"),
    (401, "HTTP_UNAUTHORIZED", "Unauthorized"),
    (402, "HTTP_PAYMENT_REQUIRED", "Payment Required"),
    (403, "HTTP_FORBIDDEN", "Forbidden"),
    (404, "HTTP_NOT_FOUND", "Not Found"),
    (405, "HTTP_METHOD_NOT_ALLOWED", "Method Not Allowed"),
    (406, "HTTP_NOT_ACCEPTABLE", "Not Acceptable"),
    (407, "HTTP_PROXY_AUTHENTICATION_REQUIRED", "Proxy Authentication Required"),
    (408, "HTTP_REQUEST_TIMEOUT", "Request Timeout"),
    (409, "HTTP_CONFLICT", "Conflict"),
    (410, "HTTP_GONE", "Gone"),
    (411, "HTTP_LENGTH_REQUIRED", "Length Required"),
    (412, "HTTP_PRECONDITION_FAILED", "Precondition Failed"),
    (413, "HTTP_PAYLOAD_TOO_LARGE", "Payload Too Large"),
    (414, "HTTP_URI_TOO_LONG", "URI Too Long"),
    (415, "HTTP_UNSUPPORTED_MEDIA_TYPE", "Unsupported Media Type"),
    (416, "HTTP_RANGE_NOT_SATISFIABLE", "Range Not Satisfiable"),
    (417, "HTTP_EXPECTATION_FAILED", "Expectation Failed"),
    (418, "HTTP_IM_A_TEAPOT", "I'm a teapot"),
    (421, "HTTP_MISDIRECTED_REQUEST", "Misdirected Request"),
    (422, "HTTP_UNPROCESSABLE_ENTITY", "Unprocessable Entity"),
    (423, "HTTP_LOCKED", "Locked"),
    (424, "HTTP_FAILED_DEPENDENCY", "Failed Dependency"),
    (425, "HTTP_TOO_EARLY", "Too Early"),
    (426, "HTTP_UPGRADE_REQUIRED", "Upgrade Required"),
    (428, "HTTP_PRECONDITION_REQUIRED", "Precondition Required"),
    (429, "HTTP_TOO_MANY_REQUESTS", "Too Many Requests"),
    (431, "HTTP_REQUEST_HEADER_FIELDS_TOO_LARGE", "Request Header Fields Too Large"),
    (451, "HTTP_UNAVAILABLE_FOR_LEGAL_REASONS", "Unavailable For Legal Reasons"),
    (500, "HTTP_INTERNAL_SERVER_ERROR", "Internal Server Error"),
    (501, "HTTP_NOT_IMPLEMENTED", "Not Implemented"),
    (502, "HTTP_BAD_GATEWAY", "Bad Gateway"),
    (503, "HTTP_SERVICE_UNAVAILABLE", "Service Unavailable"),
    (504, "HTTP_GATEWAY_TIMEOUT", "Gateway Timeout"),
    (505, "HTTP_VERSION_NOT_SUPPORTED", "HTTP Version Not Supported"),
    (506, "HTTP_VARIANT_ALSO_NEGOTIATES", "Variant Also Negotiates"),
    (507, "HTTP_INSUFFICIENT_STORAGE", "Insufficient Storage"),
    (508, "HTTP_LOOP_DETECTED", "Loop Detected"),
    (510, "HTTP_NOT_EXTENDED", "Not Extended"),
    (511, "HTTP_NETWORK_AUTHENTICATION_REQUIRED", "Network Authentication Required"),
];

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::probe::{ProbeMethod, ProbeOutcome};

    fn attempt(method: ProbeMethod, status: u16, text: &str) -> ProbeAttempt {
        ProbeAttempt::new(method, ProbeOutcome::success(status, text), Duration::from_millis(12))
    }

    #[test]
    fn table_names_scenario_codes() {
        assert_eq!(
            classify_status(451),
            Some(("HTTP_UNAVAILABLE_FOR_LEGAL_REASONS", "Unavailable For Legal Reasons"))
        );
        assert_eq!(classify_status(403), Some(("HTTP_FORBIDDEN", "Forbidden")));
        assert_eq!(classify_status(408), Some(("HTTP_REQUEST_TIMEOUT", "Request Timeout")));
        assert_eq!(classify_status(599), None);
        assert_eq!(classify_status(200), None);
    }

    #[test]
    fn table_covers_every_standard_error_status() {
        for status in 400u16..=599 {
            let known = reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .is_some();
            if known {
                assert!(classify_status(status).is_some(), "missing entry for {}", status);
            }
        }
    }

    #[test]
    fn table_messages_match_canonical_reasons() {
        for (status, _, message) in STATUS_TABLE {
            let canonical = reqwest::StatusCode::from_u16(*status)
                .ok()
                .and_then(|s| s.canonical_reason());
            if let Some(canonical) = canonical {
                assert_eq!(canonical.to_lowercase(), message.to_lowercase(), "status {}", status);
            }
        }
    }

    #[test]
    fn timeout_failure_shares_code_with_408() {
        assert_eq!(classify_failure(FailureKind::Timeout), classify_status(408));
        assert_eq!(classify_failure(FailureKind::Other), None);
    }

    #[test]
    fn classified_status_serializes_without_metadata() {
        let status = StreamStatus::classified("HTTP_FORBIDDEN", "Forbidden");
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(
            value,
            json!({ "ok": false, "code": "HTTP_FORBIDDEN", "message": "Forbidden" })
        );
    }

    #[test]
    fn single_attempt_success_omits_metadata() {
        let status = StreamStatus::Probed {
            ok: true,
            requests: vec![attempt(ProbeMethod::Head, 200, "OK")],
        };
        assert!(status.requests().is_none());
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value, json!({ "ok": true }));
    }

    #[test]
    fn fallback_success_keeps_trail() {
        let status = StreamStatus::Probed {
            ok: true,
            requests: vec![
                attempt(ProbeMethod::Head, 405, "Method Not Allowed"),
                attempt(ProbeMethod::Get, 206, "Partial Content"),
            ],
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["ok"], json!(true));
        assert!(value.get("code").is_none());
        let requests = value["metadata"]["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["method"], json!("HEAD"));
        assert_eq!(requests[0]["outcome"]["status"], json!(405));
        assert_eq!(requests[1]["method"], json!("GET"));
        assert_eq!(requests[1]["elapsed_ms"], json!(12));
    }

    #[test]
    fn unclassified_failure_keeps_single_attempt_trail() {
        let status = StreamStatus::Probed {
            ok: false,
            requests: vec![attempt(ProbeMethod::Head, 599, "Unknown")],
        };
        assert_eq!(status.requests().map(|r| r.len()), Some(1));
        assert!(status.code().is_none());
    }

    #[test]
    fn deserialize_restores_both_shapes() {
        let classified = StreamStatus::classified("HTTP_GONE", "Gone");
        let json = serde_json::to_string(&classified).unwrap();
        assert_eq!(serde_json::from_str::<StreamStatus>(&json).unwrap(), classified);

        let probed: StreamStatus = serde_json::from_value(json!({ "ok": true })).unwrap();
        assert!(probed.ok());
        assert!(probed.requests().is_none());

        let mixed = serde_json::from_value::<StreamStatus>(json!({
            "ok": false,
            "code": "HTTP_GONE",
            "message": "Gone",
            "metadata": { "requests": [] }
        }));
        assert!(mixed.is_err());
    }
}
