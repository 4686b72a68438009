//! Probe types: monitored targets, check results, and the [`Prober`] seam.

pub mod http;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::http::HttpProber;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("malformed url '{url}': {reason}")]
    Malformed { url: String, reason: String },

    #[error("unsupported scheme '{scheme}' in url '{url}' (expected http or https)")]
    UnsupportedScheme { url: String, scheme: String },
}

/// A monitored URL. Only constructible from a valid `http`/`https` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    url: String,
    label: Option<String>,
}

impl Target {
    /// Validate `url` and build a target. The input string is kept verbatim as the
    /// lookup key so queries match what the operator configured.
    pub fn parse(url: &str, label: Option<String>) -> Result<Self, TargetError> {
        let parsed = Url::parse(url).map_err(|e| TargetError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(TargetError::UnsupportedScheme {
                    url: url.to_string(),
                    scheme: other.to_string(),
                })
            }
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(TargetError::Malformed {
                url: url.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self {
            url: url.to_string(),
            label,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Why a check produced no usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailure {
    Timeout,
    ConnectionRefused,
    DnsFailure,
    Other,
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeFailure::Timeout => write!(f, "timeout"),
            ProbeFailure::ConnectionRefused => write!(f, "connection_refused"),
            ProbeFailure::DnsFailure => write!(f, "dns_failure"),
            ProbeFailure::Other => write!(f, "other"),
        }
    }
}

/// Outcome of a single check. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub status_code: Option<u16>,
    pub latency_ms: f64,
    pub error: Option<String>,
    pub failure: Option<ProbeFailure>,
}

impl CheckResult {
    /// Status codes 200..=399 count as healthy.
    pub fn is_ok_status(code: u16) -> bool {
        (200..400).contains(&code)
    }

    /// Result for a response that was fully received.
    pub fn from_status(timestamp: DateTime<Utc>, status_code: u16, latency_ms: f64) -> Self {
        Self {
            timestamp,
            success: Self::is_ok_status(status_code),
            status_code: Some(status_code),
            latency_ms,
            error: None,
            failure: None,
        }
    }

    /// Result for a check that failed before or while receiving a response.
    pub fn failed(
        timestamp: DateTime<Utc>,
        status_code: Option<u16>,
        latency_ms: f64,
        failure: ProbeFailure,
        error: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            success: false,
            status_code,
            latency_ms,
            error: Some(error.into()),
            failure: Some(failure),
        }
    }
}

/// Performs one outbound check. Implementations must be total: every failure
/// is folded into the returned [`CheckResult`].
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn check(&self, target: &Target) -> CheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_http_and_https() {
        let t = Target::parse("https://example.com/health", Some("Example".into())).unwrap();
        assert_eq!(t.url(), "https://example.com/health");
        assert_eq!(t.label(), Some("Example"));

        assert!(Target::parse("http://127.0.0.1:8080/", None).is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Target::parse("not a url", None).unwrap_err();
        assert!(matches!(err, TargetError::Malformed { .. }));
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = Target::parse("ftp://example.com/file", None).unwrap_err();
        assert_eq!(
            err,
            TargetError::UnsupportedScheme {
                url: "ftp://example.com/file".into(),
                scheme: "ftp".into(),
            }
        );
    }

    #[test]
    fn test_ok_status_range() {
        assert!(!CheckResult::is_ok_status(199));
        assert!(CheckResult::is_ok_status(200));
        assert!(CheckResult::is_ok_status(301));
        assert!(CheckResult::is_ok_status(399));
        assert!(!CheckResult::is_ok_status(404));
        assert!(!CheckResult::is_ok_status(503));
    }

    #[test]
    fn test_from_status_keeps_code_on_failure() {
        let r = CheckResult::from_status(Utc::now(), 503, 12.5);
        assert!(!r.success);
        assert_eq!(r.status_code, Some(503));
        assert!(r.error.is_none());
        assert!(r.failure.is_none());
    }

    #[test]
    fn test_failure_serializes_snake_case() {
        let json = serde_json::to_string(&ProbeFailure::ConnectionRefused).unwrap();
        assert_eq!(json, "\"connection_refused\"");
        assert_eq!(ProbeFailure::DnsFailure.to_string(), "dns_failure");
    }
}
