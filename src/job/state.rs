//! # Job state and result value.

use crate::error::JobError;

/// Activity of a watch context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum JobState {
    /// No run in flight.
    #[default]
    Idle,
    /// A run is executing (or finishing its publication).
    Running,
}

impl JobState {
    /// Returns `true` for [`JobState::Running`].
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, JobState::Running)
    }

    /// Returns a short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
        }
    }
}

/// Outcome of one completed run: the body's output or its (mapped) failure.
pub type JobResult<R> = Result<R, JobError>;
