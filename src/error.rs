//! Error types used by watch contexts, hosts and job bodies.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] - precondition violations surfaced at the call site
//!   (double start, busy context, invalid start policy).
//! - [`JobError`] - failures of an individual job run; these travel through the
//!   result stream as `Err(JobError)` and are never returned to the caller of `start`.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the jobwatch runtime itself.
///
/// These are fatal to the operation that raised them and are never routed
/// through a result stream.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A run was requested while another run of the same context is in flight.
    #[error("watch context {context:?} already has a job in flight")]
    AlreadyRunning {
        /// Name of the busy watch context.
        context: String,
    },

    /// [`Host::start`](crate::Host::start) was called on an active host.
    #[error("host {host:?} is already active")]
    AlreadyActive {
        /// Name of the host.
        host: String,
    },

    /// The host has no execution scope (not started yet, or disposed).
    #[error("host {host:?} is not active")]
    NotActive {
        /// Name of the host.
        host: String,
    },

    /// A lazy start policy requires zero subscribers on both streams.
    #[error("lazy start requires at least one positive subscriber threshold")]
    InvalidStartPolicy,

    /// The run task was aborted or dropped by the runtime before it could report.
    #[error("job of {context:?} did not finish: {reason}")]
    JoinFailed {
        /// Name of the watch context.
        context: String,
        /// Join error description.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use jobwatch::RuntimeError;
    ///
    /// let err = RuntimeError::AlreadyRunning { context: "sync".into() };
    /// assert_eq!(err.as_label(), "runtime_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning { .. } => "runtime_already_running",
            RuntimeError::AlreadyActive { .. } => "runtime_already_active",
            RuntimeError::NotActive { .. } => "runtime_not_active",
            RuntimeError::InvalidStartPolicy => "runtime_invalid_start_policy",
            RuntimeError::JoinFailed { .. } => "runtime_join_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::AlreadyRunning { context } => format!("busy context={context}"),
            RuntimeError::AlreadyActive { host } => format!("already active host={host}"),
            RuntimeError::NotActive { host } => format!("inactive host={host}"),
            RuntimeError::InvalidStartPolicy => "lazy thresholds are both zero".to_string(),
            RuntimeError::JoinFailed { context, reason } => {
                format!("join failed context={context} reason={reason}")
            }
        }
    }
}

/// # Errors produced by a job run.
///
/// A job body returns `Result<R, JobError>`. Everything except [`JobError::Canceled`]
/// is passed through the error mapper and published to result subscribers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Job execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Job execution exceeded the configured per-run timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The job body panicked.
    #[error("job panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Cooperative cancellation. Never published as a result.
    #[error("job cancelled")]
    Canceled,
}

impl JobError {
    /// Builds a [`JobError::Fail`] from anything displayable.
    ///
    /// # Example
    /// ```
    /// use jobwatch::JobError;
    ///
    /// let err = JobError::fail("hello");
    /// assert_eq!(err.to_string(), "execution failed: hello");
    /// ```
    pub fn fail(error: impl std::fmt::Display) -> Self {
        JobError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Timeout { .. } => "job_timeout",
            JobError::Panicked { .. } => "job_panicked",
            JobError::Canceled => "job_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            JobError::Fail { error } => format!("error: {error}"),
            JobError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            JobError::Panicked { info } => format!("panic: {info}"),
            JobError::Canceled => "job cancelled".to_string(),
        }
    }

    /// Indicates whether this value signals cancellation rather than a job outcome.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, JobError::Canceled)
    }
}

impl From<String> for JobError {
    fn from(error: String) -> Self {
        JobError::Fail { error }
    }
}

impl From<&str> for JobError {
    fn from(error: &str) -> Self {
        JobError::fail(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_labels_are_stable() {
        let err = RuntimeError::AlreadyActive { host: "app".into() };
        assert_eq!(err.as_label(), "runtime_already_active");
        assert_eq!(err.as_message(), "already active host=app");
        assert_eq!(
            RuntimeError::InvalidStartPolicy.as_label(),
            "runtime_invalid_start_policy"
        );
    }

    #[test]
    fn test_job_error_conversions() {
        let from_str: JobError = "boom".into();
        assert_eq!(
            from_str,
            JobError::Fail {
                error: "boom".to_string()
            }
        );
        assert_eq!(from_str.as_message(), "error: boom");
        assert!(!from_str.is_cancellation());
        assert!(JobError::Canceled.is_cancellation());
    }

    #[test]
    fn test_timeout_display() {
        let err = JobError::Timeout {
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.as_label(), "job_timeout");
        assert_eq!(err.to_string(), "timed out after 250ms");
    }
}
