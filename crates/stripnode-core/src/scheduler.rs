//! Flush scheduling.
//!
//! Timestamps are `Duration`s on a monotonic clock whose origin is the node
//! start (live) or the first captured packet (replay). The minimum interval is
//! always measured from the previous flush, never from an ideal tick, so a
//! burst of complete frames is still throttled to what the strip bus can take.

use std::time::Duration;

use serde::Serialize;

use crate::completion::UniverseMask;
use crate::config::ConfigError;

/// Validated flush timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    min_interval: Duration,
    max_staleness: Option<Duration>,
}

impl Timing {
    pub fn new(
        min_interval: Duration,
        max_staleness: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        if let Some(max_staleness) = max_staleness {
            if max_staleness < min_interval {
                return Err(ConfigError::StalenessBelowInterval {
                    min_interval_ms: min_interval.as_millis() as u64,
                    max_staleness_ms: max_staleness.as_millis() as u64,
                });
            }
        }
        Ok(Self {
            min_interval,
            max_staleness,
        })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn max_staleness(&self) -> Option<Duration> {
        self.max_staleness
    }
}

/// Why the buffer was pushed to the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    /// Every universe contributed and the minimum interval elapsed.
    Complete,
    /// Some universes are missing but the frame waited longer than allowed.
    Stale,
    /// The source ended with contributions still pending.
    Drain,
}

#[derive(Debug, Clone)]
pub struct RenderScheduler {
    timing: Timing,
    started_at: Duration,
    last_flush: Option<Duration>,
}

impl RenderScheduler {
    pub fn new(timing: Timing, started_at: Duration) -> Self {
        Self {
            timing,
            started_at,
            last_flush: None,
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn last_flush(&self) -> Option<Duration> {
        self.last_flush
    }

    /// Flush decision for the current mask. `None` means defer and keep
    /// collecting contributions.
    pub fn decide(&self, mask: &UniverseMask, now: Duration) -> Option<FlushReason> {
        if mask.is_empty() || !self.interval_elapsed(now) {
            return None;
        }
        if mask.is_complete() {
            return Some(FlushReason::Complete);
        }
        let max_staleness = self.timing.max_staleness?;
        let reference = self.last_flush.unwrap_or(self.started_at);
        (now.saturating_sub(reference) > max_staleness).then_some(FlushReason::Stale)
    }

    /// Earliest time a final flush of pending contributions may happen.
    pub fn drain_at(&self, mask: &UniverseMask, now: Duration) -> Option<Duration> {
        if mask.is_empty() {
            return None;
        }
        Some(match self.last_flush {
            Some(last) => now.max(last + self.timing.min_interval),
            None => now,
        })
    }

    pub fn record_flush(&mut self, now: Duration) {
        self.last_flush = Some(now);
    }

    fn interval_elapsed(&self, now: Duration) -> bool {
        match self.last_flush {
            Some(last) => now.saturating_sub(last) >= self.timing.min_interval,
            None => true,
        }
    }
}
