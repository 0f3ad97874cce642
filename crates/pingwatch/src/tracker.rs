//! Drop detection.
//!
//! `DropTracker` is a two-state machine over successive probe outcomes:
//!
//! - UP + success: no event
//! - UP + failure: open a drop event, signal `DropDetected` (count 1)
//! - DOWN + failure: extend the open event, signal `DropDetected` (count n)
//! - DOWN + success: close the event, signal `Recovered`
//!
//! An event still open when the run ends is closed at the run-end time and
//! flagged unresolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::ProbeOutcome;

/// Link state as seen by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Up,
    Down,
}

/// A maximal run of consecutive failed probes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEvent {
    /// Timestamp of the first failed probe
    pub start_time: DateTime<Utc>,

    /// Timestamp of the recovering probe, or run end for unresolved events
    pub end_time: Option<DateTime<Utc>>,

    /// Number of failed probes in the event
    pub consecutive_count: u32,

    /// The run ended before a successful probe closed this event
    pub unresolved: bool,
}

impl DropEvent {
    fn open(at: DateTime<Utc>) -> Self {
        Self { start_time: at, end_time: None, consecutive_count: 1, unresolved: false }
    }

    /// Wall-clock length of the event, once closed
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Transition emitted by the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerSignal {
    /// A probe failed; `consecutive_count` is the open event's running count
    DropDetected { at: DateTime<Utc>, consecutive_count: u32 },

    /// A success closed the open event
    Recovered { event: DropEvent },
}

impl TrackerSignal {
    /// Whether this signal opened a new drop event
    pub fn opens_event(&self) -> bool {
        matches!(self, TrackerSignal::DropDetected { consecutive_count: 1, .. })
    }

    /// Running or final consecutive count carried by the signal
    pub fn consecutive_count(&self) -> u32 {
        match self {
            TrackerSignal::DropDetected { consecutive_count, .. } => *consecutive_count,
            TrackerSignal::Recovered { event } => event.consecutive_count,
        }
    }
}

/// Classifies probe outcomes into drop and recovery events
#[derive(Debug, Default)]
pub struct DropTracker {
    open: Option<DropEvent>,
    history: Vec<DropEvent>,
}

impl DropTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> LinkState {
        if self.open.is_some() { LinkState::Down } else { LinkState::Up }
    }

    /// Failures in the open event, 0 when UP
    pub fn consecutive_count(&self) -> u32 {
        self.open.as_ref().map_or(0, |event| event.consecutive_count)
    }

    /// The currently open event, if any
    pub fn open_event(&self) -> Option<&DropEvent> {
        self.open.as_ref()
    }

    /// Closed events so far, oldest first
    pub fn history(&self) -> &[DropEvent] {
        &self.history
    }

    /// Feed one outcome; returns the transition it caused, if any
    pub fn observe(&mut self, outcome: &ProbeOutcome) -> Option<TrackerSignal> {
        match (self.open.as_mut(), outcome.succeeded) {
            (None, true) => None,
            (None, false) => {
                self.open = Some(DropEvent::open(outcome.timestamp));
                Some(TrackerSignal::DropDetected { at: outcome.timestamp, consecutive_count: 1 })
            }
            (Some(event), false) => {
                event.consecutive_count += 1;
                Some(TrackerSignal::DropDetected {
                    at: outcome.timestamp,
                    consecutive_count: event.consecutive_count,
                })
            }
            (Some(_), true) => {
                let mut event = self.open.take()?;
                event.end_time = Some(outcome.timestamp);
                self.history.push(event.clone());
                Some(TrackerSignal::Recovered { event })
            }
        }
    }

    /// End the run: close any open event as unresolved and return the full
    /// event history
    pub fn finish(mut self, run_end: DateTime<Utc>) -> Vec<DropEvent> {
        if let Some(mut event) = self.open.take() {
            event.end_time = Some(run_end);
            event.unresolved = true;
            self.history.push(event);
        }
        self.history
    }
}
