//! # WatchContext: single-flight job execution with observable state and results.
//!
//! A [`WatchContext`] runs one job body at a time and publishes:
//! - its [`JobState`] (`Idle` → `Running` → `Idle`) to state subscribers,
//! - one [`JobResult`] per completed run to result subscribers.
//!
//! ## Run lifecycle
//! ```text
//! execute_in(scope, policy, body)
//!   ├─ Eagerly: claim (latest state := Running) ── busy? ─► Err(AlreadyRunning) to the caller
//!   └─ spawn(run):
//!        ├─ Lazily: wait for subscriber thresholds (cancellable)
//!        │          claim ── busy? ─► JobHandle::join() = Err(AlreadyRunning)
//!        ├─ deliver Running
//!        ├─ run_once(body, child token, timeout)
//!        │     ├─ Completed(v) ─► publish Ok(v)
//!        │     ├─ Failed(e)    ─► map error ─► publish Err(mapped)
//!        │     └─ Canceled     ─► (nothing)
//!        └─ release (latest state := Idle) ─► deliver Idle
//! ```
//!
//! ## Rules
//! - At most one run in flight per context. The flight slot *is* the latest state:
//!   claiming stores `Running` and releasing stores `Idle`, each under the state
//!   channel's lock, so `current_state()` and start rejection always agree and an
//!   observer that has seen `Idle` can start again.
//! - `Running` reaches subscribers before the run's result; `Idle` strictly after.
//! - Deliveries of a run stop waiting for slow subscribers once the run is cancelled;
//!   the latest state is still updated, so a cancelled run always ends `Idle`.
//! - Error mapping: context mapper, else the host's mapper, else unchanged.
//! - Cancellation is never published as a result.
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use jobwatch::{JobState, JobStream, StartPolicy, WatchContext};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), jobwatch::RuntimeError> {
//! let ctx = WatchContext::<String>::named("greeter");
//! let mut state = ctx.state();
//! let mut results = ctx.results(false);
//!
//! let scope = CancellationToken::new();
//! ctx.execute_in(&scope, StartPolicy::Eagerly, |_token| async { Ok("hi".to_string()) })?
//!     .join()
//!     .await?;
//!
//! assert_eq!(state.next().await, Some(JobState::Idle));
//! assert_eq!(state.next().await, Some(JobState::Running));
//! assert_eq!(results.next().await, Some(Ok("hi".to_string())));
//! assert_eq!(state.next().await, Some(JobState::Idle));
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    config::Config,
    core::{
        gate,
        handle::{ExitReason, JobHandle},
        naming::{self, NameSequence},
        registry::{Registry, Teardown},
        runner::{Outcome, run_once},
    },
    error::{JobError, RuntimeError},
    events::{ReplayChannel, Staged},
    job::{JobResult, JobState, JobStream},
    policies::StartPolicy,
};

/// Transformation applied to job failures before they are published.
pub type ErrorMapper = Arc<dyn Fn(JobError) -> JobError + Send + Sync>;

/// Claimed single-flight slot.
///
/// Released with [`release`](Flight::release), or on drop without fanning `Idle` out.
struct Flight<R> {
    inner: Arc<Inner<R>>,
    released: bool,
}

impl<R> Flight<R> {
    /// Stores `Running` unless a run already holds the slot.
    fn claim(inner: &Arc<Inner<R>>) -> Result<(Self, Staged<JobState>), RuntimeError> {
        let running = inner
            .state
            .stage_if(|s| s != Some(&JobState::Running), JobState::Running)
            .ok_or_else(|| RuntimeError::AlreadyRunning {
                context: inner.name.to_string(),
            })?;
        let flight = Self {
            inner: Arc::clone(inner),
            released: false,
        };
        Ok((flight, running))
    }

    /// Stores `Idle`, freeing the slot; the caller delivers it.
    fn release(mut self) -> Staged<JobState> {
        self.released = true;
        self.inner.state.stage(JobState::Idle)
    }
}

impl<R> Drop for Flight<R> {
    fn drop(&mut self) {
        if !self.released {
            drop(self.inner.state.stage(JobState::Idle));
        }
    }
}

struct Inner<R> {
    name: Arc<str>,
    state: ReplayChannel<JobState>,
    results: ReplayChannel<JobResult<R>>,
    changed: Arc<Notify>,
    error_mapper: Option<ErrorMapper>,
    fallback_mapper: Option<ErrorMapper>,
    timeout: Option<Duration>,
}

impl<R> Inner<R> {
    fn map_error(&self, err: JobError) -> JobError {
        match (&self.error_mapper, &self.fallback_mapper) {
            (Some(mapper), _) => mapper(err),
            (None, Some(mapper)) => mapper(err),
            (None, None) => err,
        }
    }
}

impl<R: Clone + Send + 'static> Teardown for Inner<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn teardown(&self) {
        self.state.disconnect();
        self.results.disconnect();
    }
}

/// Single-flight job engine.
///
/// Cheap to clone; clones share the same state, results and flight slot.
pub struct WatchContext<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for WatchContext<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Clone + Send + 'static> WatchContext<R> {
    /// Creates a standalone context with a generated name and default config.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a standalone context with the given name.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::builder().name(name).build()
    }

    /// Returns a builder for a standalone context.
    pub fn builder() -> WatchContextBuilder<R> {
        WatchContextBuilder::new(Config::default(), None, None, None)
    }

    /// Context name (explicit or generated).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `true` while a run holds the flight slot.
    pub fn is_running(&self) -> bool {
        self.current_state().is_running()
    }

    /// Latest published result, if any run completed.
    pub fn last_result(&self) -> Option<JobResult<R>> {
        self.inner.results.latest()
    }

    /// Number of live `state()` subscriptions.
    pub fn state_subscribers(&self) -> usize {
        self.inner.state.subscriber_count()
    }

    /// Number of live `results()` subscriptions (filtered views included).
    pub fn result_subscribers(&self) -> usize {
        self.inner.results.subscriber_count()
    }

    /// Ends every current state and result subscription.
    ///
    /// The context stays usable; later subscribers still get replay.
    pub fn disconnect(&self) {
        self.inner.teardown();
    }

    /// Schedules `body` under a child token of `scope` and returns immediately.
    ///
    /// The body receives a per-run cancellation token. Must be called within a
    /// Tokio runtime.
    ///
    /// ### Errors
    /// [`RuntimeError::AlreadyRunning`] if `policy` is eager and a run is in flight.
    /// Lazy runs perform the same check once their gate opens and report it through
    /// [`JobHandle::join`].
    pub fn execute_in<F, Fut>(
        &self,
        scope: &CancellationToken,
        policy: StartPolicy,
        body: F,
    ) -> Result<JobHandle, RuntimeError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = JobResult<R>> + Send + 'static,
    {
        let claimed = match policy {
            StartPolicy::Eagerly => Some(self.claim()?),
            StartPolicy::Lazily(_) => None,
        };

        let token = scope.child_token();
        let inner = Arc::clone(&self.inner);
        let join = tokio::spawn(execute(inner, policy, claimed, token.clone(), body));
        Ok(JobHandle::new(Arc::clone(&self.inner.name), token, join))
    }

    fn claim(&self) -> Result<(Flight<R>, Staged<JobState>), RuntimeError> {
        Flight::claim(&self.inner).inspect_err(|e| {
            warn!(context = %self.inner.name, label = e.as_label(), "start rejected");
        })
    }
}

impl<R: Clone + Send + 'static> Default for WatchContext<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for WatchContext<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchContext")
            .field("name", &self.inner.name)
            .field("state", &self.inner.state.latest())
            .finish_non_exhaustive()
    }
}

impl<R: Clone + Send + 'static> JobStream<R> for WatchContext<R> {
    fn current_state(&self) -> JobState {
        self.inner.state.latest().unwrap_or_default()
    }

    fn state(&self) -> BoxStream<'static, JobState> {
        self.inner.state.subscribe(true).boxed()
    }

    fn results(&self, replay_last: bool) -> BoxStream<'static, JobResult<R>> {
        self.inner.results.subscribe(replay_last).boxed()
    }
}

/// Body of the spawned run task.
async fn execute<R, F, Fut>(
    inner: Arc<Inner<R>>,
    policy: StartPolicy,
    claimed: Option<(Flight<R>, Staged<JobState>)>,
    token: CancellationToken,
    body: F,
) -> Result<ExitReason, RuntimeError>
where
    R: Clone + Send + 'static,
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = JobResult<R>>,
{
    let (flight, running) = match claimed {
        Some(claimed) => claimed,
        None => {
            if let StartPolicy::Lazily(lazy) = policy {
                let counts = || (inner.state.subscriber_count(), inner.results.subscriber_count());
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(context = %inner.name, "lazy run cancelled before start");
                        return Ok(ExitReason::Canceled);
                    }
                    _ = gate::wait_for_subscribers(lazy, &inner.changed, counts) => {}
                }
            }
            Flight::claim(&inner).inspect_err(|e| {
                warn!(context = %inner.name, label = e.as_label(), "lazy start rejected");
            })?
        }
    };

    running.deliver(&token).await;
    debug!(context = %inner.name, "job started");

    let exit = match run_once(body, &token, inner.timeout).await {
        Outcome::Completed(value) => {
            inner.results.publish_until(Ok(value), &token).await;
            ExitReason::Succeeded
        }
        Outcome::Failed(err) => {
            let err = inner.map_error(err);
            warn!(context = %inner.name, label = err.as_label(), error = %err, "job failed");
            inner.results.publish_until(Err(err), &token).await;
            ExitReason::Failed
        }
        Outcome::Canceled => ExitReason::Canceled,
    };

    flight.release().deliver(&token).await;
    debug!(context = %inner.name, exit = exit.as_label(), "job finished");
    Ok(exit)
}

/// Builder for [`WatchContext`].
///
/// Obtained from [`WatchContext::builder`] (standalone) or
/// [`Host::watch_context`](crate::Host::watch_context) (host-owned).
pub struct WatchContextBuilder<R> {
    name: Option<Arc<str>>,
    cfg: Config,
    timeout: Option<Duration>,
    error_mapper: Option<ErrorMapper>,
    fallback_mapper: Option<ErrorMapper>,
    names: Option<Arc<NameSequence>>,
    registry: Option<Arc<Registry>>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Clone + Send + 'static> WatchContextBuilder<R> {
    pub(crate) fn new(
        cfg: Config,
        fallback_mapper: Option<ErrorMapper>,
        names: Option<Arc<NameSequence>>,
        registry: Option<Arc<Registry>>,
    ) -> Self {
        Self {
            name: None,
            cfg,
            timeout: None,
            error_mapper: None,
            fallback_mapper,
            names,
            registry,
            _marker: PhantomData,
        }
    }

    /// Sets an explicit name instead of a generated one.
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the context's own error mapper (takes precedence over a host mapper).
    pub fn error_mapper<F>(mut self, f: F) -> Self
    where
        F: Fn(JobError) -> JobError + Send + Sync + 'static,
    {
        self.error_mapper = Some(Arc::new(f));
        self
    }

    /// Replaces the configuration (buffers and default timeout).
    pub fn config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Overrides the per-run timeout (`Duration::ZERO` disables it).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the context (and registers it with its host, if any).
    pub fn build(self) -> WatchContext<R> {
        let name = match (self.name, &self.names) {
            (Some(name), _) => name,
            (None, Some(names)) => names.next_name(),
            (None, None) => naming::standalone_name(),
        };
        let changed = Arc::new(Notify::new());
        let inner = Arc::new(Inner {
            name,
            state: ReplayChannel::new(
                Some(JobState::Idle),
                self.cfg.state_capacity(),
                Arc::clone(&changed),
            ),
            results: ReplayChannel::new(None, self.cfg.result_capacity(), Arc::clone(&changed)),
            changed,
            error_mapper: self.error_mapper,
            fallback_mapper: self.fallback_mapper,
            timeout: self.timeout.or_else(|| self.cfg.default_timeout()),
        });

        if let Some(registry) = &self.registry {
            let weak = Arc::downgrade(&inner);
            registry.register(weak);
        }
        WatchContext { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_flight_slot_is_the_latest_state() {
        let ctx = WatchContext::<u8>::named("ctx");
        let (first, _running) = Flight::claim(&ctx.inner).expect("first claim");
        assert_eq!(ctx.current_state(), JobState::Running);
        assert!(ctx.is_running());
        assert_eq!(
            Flight::claim(&ctx.inner).err(),
            Some(RuntimeError::AlreadyRunning {
                context: "ctx".to_string()
            })
        );

        let _idle = first.release();
        assert_eq!(ctx.current_state(), JobState::Idle);
        let (second, _running) = Flight::claim(&ctx.inner).expect("claim after release");
        drop(second);
        assert_eq!(ctx.current_state(), JobState::Idle);
    }

    #[test]
    fn test_mapper_precedence() {
        let global: ErrorMapper = Arc::new(|_: JobError| JobError::fail("global"));
        let global_only =
            WatchContextBuilder::<u8>::new(Config::default(), Some(Arc::clone(&global)), None, None)
                .build();
        assert_eq!(
            global_only.inner.map_error(JobError::fail("raw")),
            JobError::fail("global")
        );

        let own = WatchContextBuilder::<u8>::new(Config::default(), Some(global), None, None)
            .error_mapper(|_| JobError::fail("own"))
            .build();
        assert_eq!(own.inner.map_error(JobError::fail("raw")), JobError::fail("own"));

        let raw = WatchContext::<u8>::new();
        assert_eq!(raw.inner.map_error(JobError::fail("raw")), JobError::fail("raw"));
    }

    #[test]
    fn test_explicit_timeout_overrides_config() {
        let cfg = Config {
            timeout: Duration::from_secs(3),
            ..Config::default()
        };
        let inherited = WatchContext::<u8>::builder().config(cfg.clone()).build();
        assert_eq!(inherited.inner.timeout, Some(Duration::from_secs(3)));

        let overridden = WatchContext::<u8>::builder()
            .config(cfg)
            .timeout(Duration::from_millis(10))
            .build();
        assert_eq!(overridden.inner.timeout, Some(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_state_replays_current_value() {
        let ctx = WatchContext::<u8>::named("fresh");
        assert_eq!(ctx.current_state(), JobState::Idle);
        let mut state = ctx.state();
        assert_eq!(state.next().now_or_never(), Some(Some(JobState::Idle)));
        assert_eq!(ctx.state_subscribers(), 1);
        drop(state);
        assert_eq!(ctx.state_subscribers(), 0);
    }
}
