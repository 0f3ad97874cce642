use std::time::{Duration, Instant};

use chrono::Utc;

use super::{ProbeError, ProbeOutcome, Prober};

/// HTTP/HTTPS prober
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &str) -> ProbeOutcome {
        let timestamp = Utc::now();
        let start = Instant::now();

        let response = match self.client.get(target).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return ProbeOutcome::failure(timestamp, "HTTP request timeout"),
            Err(e) => return ProbeOutcome::failure(timestamp, format!("HTTP request failed: {e}")),
        };

        let latency = start.elapsed();
        let status = response.status();

        // Consider 2xx and 3xx as success
        if status.is_success() || status.is_redirection() {
            ProbeOutcome::success(timestamp, latency)
        } else {
            ProbeOutcome::failure(timestamp, format!("HTTP status {}", status.as_u16()))
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
