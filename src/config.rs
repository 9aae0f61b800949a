//! # Runtime configuration.
//!
//! Provides [`Config`] centralized settings for hosts and watch contexts.
//!
//! Config is used in two ways:
//! 1. **Host creation**: `Host::builder(config)`; every context the host builds inherits it
//! 2. **Standalone contexts**: `WatchContext::builder().config(config)`
//!
//! ## Sentinel values
//! - `timeout = 0s` → no per-run timeout
//! - buffer sizes are *extra* slots on top of the single replay slot; `0` is valid

use std::time::Duration;

/// Configuration for watch contexts and the host uncaught-error sink.
///
/// ## Field semantics
/// - `result_buffer`: extra queue slots per result subscriber
/// - `state_buffer`: extra queue slots per state subscriber
/// - `uncaught_buffer`: extra queue slots per uncaught-error subscriber
/// - `timeout`: default per-run timeout (`0s` = none)
///
/// ## Overflow
/// A subscriber queue holds `1 + buffer` values. When it is full the publisher waits
/// for the subscriber to catch up; values are never dropped. Dropped subscriptions
/// are pruned and never hold a publisher back.
#[derive(Clone, Debug)]
pub struct Config {
    /// Extra buffered results per subscriber beyond the replay slot.
    pub result_buffer: usize,

    /// Extra buffered state transitions per subscriber beyond the replay slot.
    pub state_buffer: usize,

    /// Extra buffered uncaught errors per subscriber beyond the replay slot.
    pub uncaught_buffer: usize,

    /// Default per-run timeout.
    ///
    /// - `Duration::ZERO` = no timeout (job runs until completion or cancellation)
    /// - `> 0` = the run's token is cancelled and `JobError::Timeout` is published
    pub timeout: Duration,
}

impl Config {
    /// Queue capacity of a result subscription (replay slot included).
    #[inline]
    pub fn result_capacity(&self) -> usize {
        self.result_buffer.saturating_add(1)
    }

    /// Queue capacity of a state subscription (replay slot included).
    #[inline]
    pub fn state_capacity(&self) -> usize {
        self.state_buffer.saturating_add(1)
    }

    /// Queue capacity of an uncaught-error subscription (replay slot included).
    #[inline]
    pub fn uncaught_capacity(&self) -> usize {
        self.uncaught_buffer.saturating_add(1)
    }

    /// Returns the default per-run timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied per run
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `result_buffer = 64`
    /// - `state_buffer = 16`
    /// - `uncaught_buffer = 64`
    /// - `timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            result_buffer: 64,
            state_buffer: 16,
            uncaught_buffer: 64,
            timeout: Duration::ZERO,
        }
    }
}
