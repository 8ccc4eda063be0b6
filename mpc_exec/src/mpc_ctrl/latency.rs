//! Actuation latency model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Models the lag between a command being computed and the actuators responding to it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatencyModel {
    latency: Duration,
}

/// A command which may not be released before `release_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredCommand<T> {
    pub release_at: Instant,
    pub command: T,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LatencyModel {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn from_millis(latency_ms: u64) -> Self {
        Self::new(Duration::from_millis(latency_ms))
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// The earliest instant a command computed from data that arrived at `arrival` may leave.
    pub fn release_at(&self, arrival: Instant) -> Instant {
        arrival + self.latency
    }

    /// Tag a command with its release deadline.
    pub fn defer<T>(&self, arrival: Instant, command: T) -> DeferredCommand<T> {
        DeferredCommand {
            release_at: self.release_at(arrival),
            command,
        }
    }
}

impl<T> DeferredCommand<T> {
    /// A command which may be released straight away.
    pub fn immediate(now: Instant, command: T) -> Self {
        Self {
            release_at: now,
            command,
        }
    }

    /// Wait until the command may be released, then hand it over.
    ///
    /// Returns immediately if the deadline has already passed.
    pub async fn released(self) -> T {
        sleep_until(self.release_at).await;
        self.command
    }
}
