//! # Read-only observation contract over a job.
//!
//! [`JobStream`] exposes two sequences:
//! - **state**: the current [`JobState`] on subscription, then every transition;
//! - **results**: one [`JobResult`] per completed run, optionally preceded by the
//!   latest one (`replay_last`).
//!
//! [`JobStreamExt`] adds filtered views (`success_results`, `errors`) and
//! transforms (`map_success_results`, `map_errors`) on top of any `JobStream`.
//!
//! ## Replay semantics
//! ```text
//! run#1 ──► Ok(1)        run#2 ──► Ok(2)
//!                  ▲                        results(true)  sees: 1, 2
//!                  └─ subscribe here        results(false) sees: 2
//! ```
//! Filtered views are events rather than state: pass `replay_last = false`
//! unless last-value semantics are explicitly wanted.
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use jobwatch::{JobStream, JobStreamExt, StartPolicy, WatchContext};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), jobwatch::RuntimeError> {
//! let ctx = WatchContext::<u32>::named("answer");
//! let mut doubled = ctx.clone().map_success_results(|v| async move { v * 2 }).success_results(true);
//!
//! let scope = CancellationToken::new();
//! ctx.execute_in(&scope, StartPolicy::Eagerly, |_token| async { Ok(21) })?
//!     .join()
//!     .await?;
//!
//! assert_eq!(doubled.next().await, Some(42));
//! # Ok(())
//! # }
//! ```

use std::future::{Future, ready};
use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};

use crate::error::JobError;
use crate::job::state::{JobResult, JobState};

/// Observable state and results of a job.
pub trait JobStream<R>: Send + Sync {
    /// Synchronous read of the current state.
    fn current_state(&self) -> JobState;

    /// Current state followed by every subsequent transition.
    ///
    /// Ends when the underlying watch context is torn down.
    fn state(&self) -> BoxStream<'static, JobState>;

    /// Results of completed runs.
    ///
    /// With `replay_last = true` the latest result (if any) is delivered first.
    fn results(&self, replay_last: bool) -> BoxStream<'static, JobResult<R>>;
}

/// Derived views and transforms available on every [`JobStream`].
pub trait JobStreamExt<R: Send + 'static>: JobStream<R> {
    /// Successful outputs only, unwrapped.
    fn success_results(&self, replay_last: bool) -> BoxStream<'static, R> {
        self.results(replay_last)
            .filter_map(|r| ready(r.ok()))
            .boxed()
    }

    /// Failures only, unwrapped.
    fn errors(&self, replay_last: bool) -> BoxStream<'static, JobError> {
        self.results(replay_last)
            .filter_map(|r| ready(r.err()))
            .boxed()
    }

    /// Passes every successful output through `f`; state and failures are unchanged.
    ///
    /// `f` runs on the consumer's side, once per delivered value and per subscriber.
    fn map_success_results<F, Fut, U>(self, f: F) -> MapSuccessResults<Self, F, R>
    where
        Self: Sized,
        F: Fn(R) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
        U: Send + 'static,
    {
        MapSuccessResults {
            inner: self,
            f: Arc::new(f),
            _marker: PhantomData,
        }
    }

    /// Passes every failure through `f`; state and successes are unchanged.
    fn map_errors<F, Fut>(self, f: F) -> MapErrors<Self, F>
    where
        Self: Sized,
        F: Fn(JobError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobError> + Send + 'static,
    {
        MapErrors {
            inner: self,
            f: Arc::new(f),
        }
    }
}

impl<R: Send + 'static, S: JobStream<R> + ?Sized> JobStreamExt<R> for S {}

/// Job stream returned by [`JobStreamExt::map_success_results`].
pub struct MapSuccessResults<S, F, R> {
    inner: S,
    f: Arc<F>,
    _marker: PhantomData<fn(R)>,
}

impl<S, F, R, Fut, U> JobStream<U> for MapSuccessResults<S, F, R>
where
    S: JobStream<R>,
    R: Send + 'static,
    F: Fn(R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = U> + Send + 'static,
    U: Send + 'static,
{
    fn current_state(&self) -> JobState {
        self.inner.current_state()
    }

    fn state(&self) -> BoxStream<'static, JobState> {
        self.inner.state()
    }

    fn results(&self, replay_last: bool) -> BoxStream<'static, JobResult<U>> {
        let f = Arc::clone(&self.f);
        self.inner
            .results(replay_last)
            .then(move |r| {
                let f = Arc::clone(&f);
                async move {
                    match r {
                        Ok(v) => Ok(f(v).await),
                        Err(e) => Err(e),
                    }
                }
            })
            .boxed()
    }
}

/// Job stream returned by [`JobStreamExt::map_errors`].
pub struct MapErrors<S, F> {
    inner: S,
    f: Arc<F>,
}

impl<S, F, R, Fut> JobStream<R> for MapErrors<S, F>
where
    S: JobStream<R>,
    R: Send + 'static,
    F: Fn(JobError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobError> + Send + 'static,
{
    fn current_state(&self) -> JobState {
        self.inner.current_state()
    }

    fn state(&self) -> BoxStream<'static, JobState> {
        self.inner.state()
    }

    fn results(&self, replay_last: bool) -> BoxStream<'static, JobResult<R>> {
        let f = Arc::clone(&self.f);
        self.inner
            .results(replay_last)
            .then(move |r| {
                let f = Arc::clone(&f);
                async move {
                    match r {
                        Ok(v) => Ok(v),
                        Err(e) => Err(f(e).await),
                    }
                }
            })
            .boxed()
    }
}
