//! # Run a single job body.
//!
//! Drives one body future to an [`Outcome`] with optional timeout and cooperative
//! cancellation. Publication is left to the caller.
//!
//! ## Outcome mapping
//! ```text
//! body → Ok(v)                    → Completed(v)
//! body → Err(Canceled)            → Canceled
//! body → Err(e)                   → Failed(e)
//! body panics                     → Failed(Panicked { info })
//! token cancelled                 → Canceled   (body dropped at its suspension point)
//! timeout elapsed                 → cancel child token → Failed(Timeout { .. })
//! ```
//!
//! ## Rules
//! - The body receives a **child token** (isolated per run); cancelling it never
//!   cancels the parent scope.
//! - Panics are caught with `catch_unwind`; the run still reaches its finalizer.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{error::JobError, job::JobResult};

/// Terminal outcome of one run.
pub(crate) enum Outcome<R> {
    Completed(R),
    Failed(JobError),
    Canceled,
}

/// Executes `body` with a child of `token`.
pub(crate) async fn run_once<R, F, Fut>(
    body: F,
    token: &CancellationToken,
    timeout: Option<Duration>,
) -> Outcome<R>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = JobResult<R>>,
{
    let child = token.child_token();
    let guarded = AssertUnwindSafe(body(child.clone())).catch_unwind();

    let res = if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Outcome::Canceled,
            r = time::timeout(dur, guarded) => match r {
                Ok(r) => r,
                Err(_elapsed) => {
                    child.cancel();
                    return Outcome::Failed(JobError::Timeout { timeout: dur });
                }
            },
        }
    } else {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Outcome::Canceled,
            r = guarded => r,
        }
    };

    match res {
        Ok(Ok(v)) => Outcome::Completed(v),
        Ok(Err(JobError::Canceled)) => Outcome::Canceled,
        Ok(Err(e)) => Outcome::Failed(e),
        Err(panic) => Outcome::Failed(JobError::Panicked {
            info: panic_message(panic.as_ref()),
        }),
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
