//! # Uncaught failures reported by a host.
//!
//! An [`UncaughtError`] describes a failure that happened outside any watch context
//! body: ad hoc background work started with [`Host::launch`](crate::Host::launch)
//! or an explicit [`Host::report`](crate::Host::report).
//!
//! ## Ordering guarantees
//! Each value has a process-wide sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use jobwatch::{JobError, UncaughtError};
//!
//! let ev = UncaughtError::new(JobError::fail("disk full")).with_origin("flush");
//! assert_eq!(ev.origin.as_deref(), Some("flush"));
//! assert_eq!(ev.error.as_label(), "job_failed");
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::JobError;

/// Global sequence counter for uncaught failures.
static UNCAUGHT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Failure raised outside any job body.
#[derive(Clone, Debug)]
pub struct UncaughtError {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Name of the work that failed, if known.
    pub origin: Option<Arc<str>>,
    /// The failure itself.
    pub error: JobError,
}

impl UncaughtError {
    /// Wraps `error` with the current timestamp and next sequence number.
    pub fn new(error: JobError) -> Self {
        Self {
            seq: UNCAUGHT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            origin: None,
            error,
        }
    }

    /// Attaches the name of the failing work.
    #[inline]
    pub fn with_origin(mut self, origin: impl Into<Arc<str>>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = UncaughtError::new(JobError::fail("a"));
        let b = UncaughtError::new(JobError::fail("b"));
        assert!(b.seq > a.seq);
        assert!(a.origin.is_none());
    }
}
