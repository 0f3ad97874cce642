use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{ProbeOutcome, Prober};

/// TCP port prober
pub struct TcpProber {
    timeout_duration: Duration,
}

impl TcpProber {
    pub fn new(timeout_duration: Duration) -> Self {
        Self { timeout_duration }
    }
}

#[async_trait::async_trait]
impl Prober for TcpProber {
    async fn probe(&self, target: &str) -> ProbeOutcome {
        let timestamp = Utc::now();
        let start = Instant::now();

        match timeout(self.timeout_duration, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => ProbeOutcome::success(timestamp, start.elapsed()),
            Ok(Err(e)) => ProbeOutcome::failure(timestamp, format!("TCP connection failed: {e}")),
            Err(_) => ProbeOutcome::failure(timestamp, "TCP connection timeout"),
        }
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}
