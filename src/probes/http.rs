use super::{CheckResult, ProbeFailure, Prober, Target};
use chrono::Utc;
use reqwest::{redirect, Client};
use std::time::{Duration, Instant};

/// Redirect hops followed before the last response is classified.
const MAX_REDIRECTS: usize = 10;

/// HTTP GET probe. Follows redirects and drains the body so latency covers the
/// whole exchange.
pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("pingboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn check(&self, target: &Target) -> CheckResult {
        let timestamp = Utc::now();
        let start = Instant::now();

        let mut response = match self.client.get(target.url()).send().await {
            Ok(response) => response,
            Err(e) => {
                let failure = classify(&e);
                return CheckResult::failed(
                    timestamp,
                    None,
                    elapsed_ms(start),
                    failure,
                    describe(failure, &e),
                );
            }
        };

        // Drain chunk by chunk; the body itself is never held in memory.
        let status = response.status().as_u16();
        loop {
            match response.chunk().await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return CheckResult::from_status(timestamp, status, elapsed_ms(start));
                }
                Err(e) => {
                    let failure = classify(&e);
                    return CheckResult::failed(
                        timestamp,
                        Some(status),
                        elapsed_ms(start),
                        failure,
                        describe(failure, &e),
                    );
                }
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Walk the error chain looking for the underlying cause. reqwest wraps the
/// hyper connector error, which in turn wraps the `io::Error` or resolver error.
fn classify(err: &reqwest::Error) -> ProbeFailure {
    if err.is_timeout() {
        return ProbeFailure::Timeout;
    }

    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return ProbeFailure::ConnectionRefused,
                std::io::ErrorKind::TimedOut => return ProbeFailure::Timeout,
                _ => {}
            }
        }

        let msg = cause.to_string();
        if msg.contains("dns error") || msg.contains("failed to lookup address") {
            return ProbeFailure::DnsFailure;
        }

        source = cause.source();
    }

    ProbeFailure::Other
}

fn describe(failure: ProbeFailure, err: &reqwest::Error) -> String {
    let mut msg = format!("{}: {}", failure, err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
