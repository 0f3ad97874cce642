//! Running statistics for a monitoring run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TimeBasis;
use crate::probe::ProbeOutcome;
use crate::tracker::TrackerSignal;

/// Round-trip times of successful probes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub samples: u64,
    pub total: Duration,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
}

impl LatencyStats {
    fn observe(&mut self, rtt: Duration) {
        self.samples += 1;
        self.total += rtt;
        self.min = Some(self.min.map_or(rtt, |min| min.min(rtt)));
        self.max = Some(self.max.map_or(rtt, |max| max.max(rtt)));
    }

    /// Mean round-trip time
    pub fn avg(&self) -> Option<Duration> {
        if self.samples == 0 {
            return None;
        }
        let mean = match u32::try_from(self.samples) {
            Ok(samples) => self.total / samples,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.samples as f64),
        };
        Some(mean)
    }
}

/// Aggregate state of a run
///
/// Invariants: `total_drops == drops_by_hour.iter().sum()`,
/// `total_probes >= total_drops`, `current_streak <= longest_streak`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_probes: u64,
    pub total_drops: u64,
    /// Drop counts indexed by hour of day
    pub drops_by_hour: [u64; 24],
    pub longest_streak: u32,
    pub current_streak: u32,
    pub latency: LatencyStats,
}

impl RunStats {
    fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time: None,
            total_probes: 0,
            total_drops: 0,
            drops_by_hour: [0; 24],
            longest_streak: 0,
            current_streak: 0,
            latency: LatencyStats::default(),
        }
    }

    /// Fraction of successful probes; 1.0 before any probe completed
    pub fn success_rate(&self) -> f64 {
        if self.total_probes == 0 {
            return 1.0;
        }
        1.0 - self.total_drops as f64 / self.total_probes as f64
    }

    /// Hours with at least one drop, ascending
    pub fn nonzero_hours(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.drops_by_hour.iter().copied().enumerate().filter(|(_, count)| *count > 0)
    }
}

/// Folds probe outcomes and tracker signals into [`RunStats`]
#[derive(Debug)]
pub struct StatsAccumulator {
    stats: RunStats,
    time_basis: TimeBasis,
}

impl StatsAccumulator {
    pub fn new(start_time: DateTime<Utc>, time_basis: TimeBasis) -> Self {
        Self { stats: RunStats::new(start_time), time_basis }
    }

    /// Record one outcome together with the signal the tracker emitted for it
    pub fn record(&mut self, outcome: &ProbeOutcome, signal: Option<&TrackerSignal>) {
        let stats = &mut self.stats;
        stats.total_probes += 1;

        if outcome.succeeded {
            stats.current_streak = 0;
            if let Some(rtt) = outcome.latency {
                stats.latency.observe(rtt);
            }
        } else {
            stats.total_drops += 1;
            stats.drops_by_hour[self.time_basis.hour_of(outcome.timestamp)] += 1;
            stats.current_streak += 1;
        }

        if let Some(signal) = signal {
            match signal {
                TrackerSignal::DropDetected { consecutive_count, .. } => {
                    debug_assert_eq!(*consecutive_count, stats.current_streak);
                }
                TrackerSignal::Recovered { .. } => {
                    debug_assert_eq!(stats.current_streak, 0);
                }
            }
            stats.longest_streak = stats.longest_streak.max(signal.consecutive_count());
        }
        stats.longest_streak = stats.longest_streak.max(stats.current_streak);
    }

    /// Current success ratio, 1.0 when nothing has been probed yet
    pub fn success_rate(&self) -> f64 {
        self.stats.success_rate()
    }

    /// Read-only view of the running stats
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> RunStats {
        self.stats.clone()
    }

    /// Stamp the end time and hand out the final stats
    pub fn finish(mut self, end_time: DateTime<Utc>) -> RunStats {
        self.stats.end_time = Some(end_time);
        self.stats
    }
}
