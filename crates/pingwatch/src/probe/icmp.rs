use std::io::ErrorKind;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use chrono::Utc;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use tokio::net::lookup_host;
use tracing::debug;

use super::{ProbeError, ProbeOutcome, Prober};

const PAYLOAD: [u8; 56] = [0; 56];

/// Native ICMP echo prober
///
/// Needs raw or unprivileged ICMP sockets. When the OS refuses both the
/// prober cannot be built, which aborts the run before it starts.
pub struct IcmpProber {
    v4: Client,
    v6: Option<Client>,
    identifier: u16,
    sequence: AtomicU16,
    timeout: Duration,
}

impl IcmpProber {
    /// Create the ICMP clients. Must be called inside a tokio runtime.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let v4 = Client::new(&Config::default()).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => ProbeError::PermissionDenied(format!(
                "ICMP sockets need elevated privileges ({e}); try --method system"
            )),
            _ => ProbeError::Client(e.to_string()),
        })?;

        let v6 = match Client::new(&Config::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                debug!("IPv6 ICMP client unavailable: {}", e);
                None
            }
        };

        Ok(Self {
            v4,
            v6,
            identifier: rand::random(),
            sequence: AtomicU16::new(0),
            timeout,
        })
    }

    async fn resolve(target: &str) -> Result<IpAddr, String> {
        if let Ok(ip) = target.parse::<IpAddr>() {
            return Ok(ip);
        }

        let mut addrs = lookup_host((target, 0))
            .await
            .map_err(|e| format!("name resolution failed: {e}"))?;

        addrs
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| format!("name resolution returned no address for {target}"))
    }
}

#[async_trait::async_trait]
impl Prober for IcmpProber {
    async fn probe(&self, target: &str) -> ProbeOutcome {
        let timestamp = Utc::now();

        let ip = match Self::resolve(target).await {
            Ok(ip) => ip,
            Err(reason) => return ProbeOutcome::failure(timestamp, reason),
        };

        let client = match (ip, &self.v6) {
            (IpAddr::V4(_), _) => &self.v4,
            (IpAddr::V6(_), Some(v6)) => v6,
            (IpAddr::V6(_), None) => {
                return ProbeOutcome::failure(timestamp, "IPv6 ICMP is not available on this host");
            }
        };

        let mut pinger = client.pinger(ip, PingIdentifier(self.identifier)).await;
        pinger.timeout(self.timeout);

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        match pinger.ping(PingSequence(seq), &PAYLOAD).await {
            Ok((_, rtt)) => ProbeOutcome::success(timestamp, rtt),
            Err(SurgeError::Timeout { .. }) => ProbeOutcome::failure(timestamp, "ICMP echo timeout"),
            Err(e) => ProbeOutcome::failure(timestamp, format!("ICMP echo failed: {e}")),
        }
    }

    fn name(&self) -> &'static str {
        "icmp"
    }
}
