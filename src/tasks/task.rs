//! # Tasks: a start operation paired with a job stream.
//!
//! A [`Task`] binds a body taking 0–3 arguments to a [`WatchContext`] and a [`Scope`].
//! `start(args..)` forwards the arguments into `WatchContext::execute_in` under the
//! scope's current token; observers use the task itself as a [`JobStream`].
//!
//! Several tasks may share one context: they then share its single-flight slot and
//! observers see one activity signal for all of them.
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use jobwatch::{JobStreamExt, Task1, WatchContext};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), jobwatch::RuntimeError> {
//! let scope = CancellationToken::new();
//! let square = Task1::new(scope, WatchContext::named("square"), |n: u64, _token| async move {
//!     Ok(n * n)
//! });
//! let mut out = square.success_results(false);
//!
//! square.start(7)?.join().await?;
//! assert_eq!(out.next().await, Some(49));
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{JobHandle, WatchContext},
    error::RuntimeError,
    job::{JobResult, JobState, JobStream},
    policies::StartPolicy,
    tasks::scope::Scope,
};

/// Type-erased body shared by every run of a task.
type BoxBody<P, R> =
    Arc<dyn Fn(P, CancellationToken) -> BoxFuture<'static, JobResult<R>> + Send + Sync>;

/// Start operation over a shared watch context; `P` is the argument tuple.
pub struct Task<P, R> {
    ctx: WatchContext<R>,
    scope: Arc<dyn Scope>,
    body: BoxBody<P, R>,
}

/// Task without arguments.
pub type Task0<R> = Task<(), R>;
/// Task with one argument.
pub type Task1<A, R> = Task<(A,), R>;
/// Task with two arguments.
pub type Task2<A, B, R> = Task<(A, B), R>;
/// Task with three arguments.
pub type Task3<A, B, C, R> = Task<(A, B, C), R>;

impl<P, R> Clone for Task<P, R> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            scope: Arc::clone(&self.scope),
            body: Arc::clone(&self.body),
        }
    }
}

impl<P: Send + 'static, R: Clone + Send + 'static> Task<P, R> {
    fn from_parts(scope: impl Scope, ctx: WatchContext<R>, body: BoxBody<P, R>) -> Self {
        Self {
            ctx,
            scope: Arc::new(scope),
            body,
        }
    }

    fn launch(&self, args: P, policy: StartPolicy) -> Result<JobHandle, RuntimeError> {
        let scope = self.scope.token()?;
        let body = Arc::clone(&self.body);
        self.ctx
            .execute_in(&scope, policy, move |token| body(args, token))
    }

    /// The watch context this task runs on.
    pub fn context(&self) -> &WatchContext<R> {
        &self.ctx
    }

    /// Name of the underlying watch context.
    pub fn name(&self) -> &str {
        self.ctx.name()
    }
}

impl<R: Clone + Send + 'static> Task<(), R> {
    /// Creates a task whose body takes no arguments.
    pub fn new<F, Fut>(scope: impl Scope, ctx: WatchContext<R>, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<R>> + Send + 'static,
    {
        let body: BoxBody<(), R> = Arc::new(move |(): (), token: CancellationToken| f(token).boxed());
        Self::from_parts(scope, ctx, body)
    }

    /// Starts a run eagerly.
    pub fn start(&self) -> Result<JobHandle, RuntimeError> {
        self.launch((), StartPolicy::Eagerly)
    }

    /// Starts a run with an explicit start policy.
    pub fn start_with(&self, policy: StartPolicy) -> Result<JobHandle, RuntimeError> {
        self.launch((), policy)
    }
}

impl<A, R> Task<(A,), R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Creates a task whose body takes one argument.
    pub fn new<F, Fut>(scope: impl Scope, ctx: WatchContext<R>, f: F) -> Self
    where
        F: Fn(A, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<R>> + Send + 'static,
    {
        let body: BoxBody<(A,), R> =
            Arc::new(move |(a,): (A,), token: CancellationToken| f(a, token).boxed());
        Self::from_parts(scope, ctx, body)
    }

    /// Starts a run eagerly.
    pub fn start(&self, a: A) -> Result<JobHandle, RuntimeError> {
        self.launch((a,), StartPolicy::Eagerly)
    }

    /// Starts a run with an explicit start policy.
    pub fn start_with(&self, a: A, policy: StartPolicy) -> Result<JobHandle, RuntimeError> {
        self.launch((a,), policy)
    }
}

impl<A, B, R> Task<(A, B), R>
where
    A: Send + 'static,
    B: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Creates a task whose body takes two arguments.
    pub fn new<F, Fut>(scope: impl Scope, ctx: WatchContext<R>, f: F) -> Self
    where
        F: Fn(A, B, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<R>> + Send + 'static,
    {
        let body: BoxBody<(A, B), R> =
            Arc::new(move |(a, b): (A, B), token: CancellationToken| f(a, b, token).boxed());
        Self::from_parts(scope, ctx, body)
    }

    /// Starts a run eagerly.
    pub fn start(&self, a: A, b: B) -> Result<JobHandle, RuntimeError> {
        self.launch((a, b), StartPolicy::Eagerly)
    }

    /// Starts a run with an explicit start policy.
    pub fn start_with(&self, a: A, b: B, policy: StartPolicy) -> Result<JobHandle, RuntimeError> {
        self.launch((a, b), policy)
    }
}

impl<A, B, C, R> Task<(A, B, C), R>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Creates a task whose body takes three arguments.
    pub fn new<F, Fut>(scope: impl Scope, ctx: WatchContext<R>, f: F) -> Self
    where
        F: Fn(A, B, C, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<R>> + Send + 'static,
    {
        let body: BoxBody<(A, B, C), R> = Arc::new(
            move |(a, b, c): (A, B, C), token: CancellationToken| f(a, b, c, token).boxed(),
        );
        Self::from_parts(scope, ctx, body)
    }

    /// Starts a run eagerly.
    pub fn start(&self, a: A, b: B, c: C) -> Result<JobHandle, RuntimeError> {
        self.launch((a, b, c), StartPolicy::Eagerly)
    }

    /// Starts a run with an explicit start policy.
    pub fn start_with(
        &self,
        a: A,
        b: B,
        c: C,
        policy: StartPolicy,
    ) -> Result<JobHandle, RuntimeError> {
        self.launch((a, b, c), policy)
    }
}

impl<P: 'static, R: Clone + Send + 'static> JobStream<R> for Task<P, R> {
    fn current_state(&self) -> JobState {
        self.ctx.current_state()
    }

    fn state(&self) -> BoxStream<'static, JobState> {
        self.ctx.state()
    }

    fn results(&self, replay_last: bool) -> BoxStream<'static, JobResult<R>> {
        self.ctx.results(replay_last)
    }
}

impl<P, R> std::fmt::Debug for Task<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("context", &self.ctx)
            .finish_non_exhaustive()
    }
}
