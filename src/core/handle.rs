//! # Handle to one scheduled run.
//!
//! [`JobHandle`] is returned by `WatchContext::execute_in` and `Task::start`. It owns
//! the run's cancellation token (a child of the owning scope) and its join handle.
//!
//! Dropping the handle detaches the run; it keeps executing under its scope.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// Body completed and `Ok` was published.
    Succeeded,
    /// Body failed and `Err` was published.
    Failed,
    /// Run was cancelled (before or during the body); nothing was published.
    Canceled,
}

impl ExitReason {
    /// Returns a short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            ExitReason::Succeeded => "succeeded",
            ExitReason::Failed => "failed",
            ExitReason::Canceled => "canceled",
        }
    }
}

/// Cancellation and join handle of a single run.
#[derive(Debug)]
pub struct JobHandle {
    context: Arc<str>,
    token: CancellationToken,
    join: JoinHandle<Result<ExitReason, RuntimeError>>,
}

impl JobHandle {
    pub(crate) fn new(
        context: Arc<str>,
        token: CancellationToken,
        join: JoinHandle<Result<ExitReason, RuntimeError>>,
    ) -> Self {
        Self {
            context,
            token,
            join,
        }
    }

    /// Name of the watch context executing this run.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Cancels the run cooperatively.
    ///
    /// The body is dropped at its next suspension point; the state still returns to
    /// `Idle` and no result is published.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called or the scope was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `true` once the run (including its finalizer) has finished.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Token governing this run.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Waits for the run to finish, including publication of its result and `Idle`.
    ///
    /// Returns [`RuntimeError::AlreadyRunning`] when a lazily started run found the
    /// context busy once its gate opened.
    pub async fn join(self) -> Result<ExitReason, RuntimeError> {
        match self.join.await {
            Ok(res) => res,
            Err(e) => Err(RuntimeError::JoinFailed {
                context: self.context.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
