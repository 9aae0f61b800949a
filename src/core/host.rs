//! # Host: owning context for watch contexts.
//!
//! A [`Host`] owns the execution scope that job runs execute under, the uncaught-error
//! sink, a global error mapper, and the registry of the watch contexts it built.
//!
//! ## Key responsibilities
//! - create the scope on [`start`](Host::start) (optionally as a child of a parent token)
//! - cancel everything on [`dispose`](Host::dispose) or when the parent is cancelled
//! - end every subscription of every host-owned context on teardown
//! - collect failures of ad hoc work ([`launch`](Host::launch)) in the uncaught sink
//!
//! ## High-level architecture
//! ```text
//! Host::start(parent?)
//!   └─► scope token (child of parent) ─► watcher: on cancel → teardown
//!
//! Task::start ─► Host::scope() ─► WatchContext::execute_in(scope, ..)
//!                                       └─► run token = scope.child_token()
//!
//! Host::launch(origin, work) ─► spawn under scope
//!                                  └─► failure/panic ─► report ─► uncaught sink
//!
//! Host::dispose()
//!   ├─► scope.cancel()           → every in-flight run is cancelled
//!   ├─► registry.teardown_all()  → every state/result stream ends
//!   └─► uncaught.disconnect()    → every uncaught-error stream ends
//! ```
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use jobwatch::{Config, Host, JobError, JobStreamExt, Task0};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let host = Host::builder(Config::default())
//!     .name("app")
//!     .error_mapper(|e| JobError::fail(format!("app: {}", e.as_message())))
//!     .build();
//! host.start(None)?;
//!
//! let ctx = host.watch_context::<()>().name("flaky").build();
//! let task = Task0::new(host.clone(), ctx, |_token| async { Err(JobError::fail("boom")) });
//! let mut errors = task.errors(false);
//!
//! task.start()?.join().await?;
//! assert_eq!(errors.next().await, Some(JobError::fail("app: error: boom")));
//!
//! host.dispose();
//! assert_eq!(errors.next().await, None);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    config::Config,
    core::{
        context::{ErrorMapper, WatchContextBuilder},
        naming::NameSequence,
        registry::Registry,
        runner::{Outcome, run_once},
    },
    error::{JobError, RuntimeError},
    events::{ReplayChannel, Subscription, UncaughtError},
};

/// Currently active scope and the start call that created it.
struct ActiveScope {
    generation: u64,
    token: CancellationToken,
}

struct HostInner {
    name: Arc<str>,
    cfg: Config,
    scope: Mutex<Option<ActiveScope>>,
    generation: AtomicU64,
    uncaught: ReplayChannel<UncaughtError>,
    error_mapper: Option<ErrorMapper>,
    names: Arc<NameSequence>,
    registry: Arc<Registry>,
}

impl HostInner {
    fn lock_scope(&self) -> MutexGuard<'_, Option<ActiveScope>> {
        self.scope.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Ends every subscription of every owned context and of the uncaught sink.
    fn teardown(&self) {
        let contexts = self.registry.teardown_all();
        self.uncaught.disconnect();
        debug!(host = %self.name, contexts, "subscriptions terminated");
    }

    /// Teardown triggered by cancellation of the scope created by `generation`.
    fn on_scope_cancelled(&self, generation: u64) {
        let current = {
            let mut scope = self.lock_scope();
            match scope.as_ref() {
                Some(active) if active.generation == generation => scope.take(),
                _ => None,
            }
        };
        if current.is_some() {
            info!(host = %self.name, "host scope cancelled by parent");
            self.teardown();
        }
    }

    async fn report(&self, origin: Arc<str>, err: JobError) {
        error!(
            host = %self.name,
            origin = %origin,
            label = err.as_label(),
            error = %err,
            "uncaught failure"
        );
        self.uncaught
            .publish(UncaughtError::new(err).with_origin(origin))
            .await;
    }
}

impl Drop for HostInner {
    fn drop(&mut self) {
        let scope = self.scope.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(active) = scope.take() {
            active.token.cancel();
        }
    }
}

/// Owning context: execution scope, uncaught-error sink and context factory.
///
/// Cheap to clone; clones share the same scope.
#[derive(Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

impl Host {
    /// Returns a builder with the given configuration.
    pub fn builder(cfg: Config) -> HostBuilder {
        HostBuilder::new(cfg)
    }

    /// Host name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Configuration inherited by host-owned contexts.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Creates the execution scope.
    ///
    /// With `parent`, the scope is a child token: cancelling the parent cancels every
    /// run and ends every subscription, exactly like [`dispose`](Self::dispose).
    /// Must be called within a Tokio runtime.
    ///
    /// ### Errors
    /// [`RuntimeError::AlreadyActive`] if the host is already active.
    pub fn start(&self, parent: Option<&CancellationToken>) -> Result<(), RuntimeError> {
        let (generation, token, stale) = {
            let mut scope = self.inner.lock_scope();
            if let Some(active) = scope.as_ref() {
                if !active.token.is_cancelled() {
                    return Err(RuntimeError::AlreadyActive {
                        host: self.inner.name.to_string(),
                    });
                }
            }
            let token = parent
                .map(CancellationToken::child_token)
                .unwrap_or_else(CancellationToken::new);
            let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
            let stale = scope.replace(ActiveScope {
                generation,
                token: token.clone(),
            });
            (generation, token, stale)
        };

        // Parent was cancelled but its watcher has not run yet.
        if stale.is_some() {
            self.inner.teardown();
        }

        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            token.cancelled().await;
            if let Some(inner) = weak.upgrade() {
                inner.on_scope_cancelled(generation);
            }
        });

        info!(host = %self.inner.name, generation, "host started");
        Ok(())
    }

    /// Cancels the scope and ends every subscription. No-op when inactive.
    ///
    /// A disposed host may be started again.
    pub fn dispose(&self) {
        let active = self.inner.lock_scope().take();
        match active {
            Some(active) => {
                active.token.cancel();
                self.inner.teardown();
                info!(host = %self.inner.name, generation = active.generation, "host disposed");
            }
            None => debug!(host = %self.inner.name, "dispose on inactive host"),
        }
    }

    /// Returns `true` between `start` and `dispose` (or parent cancellation).
    pub fn is_active(&self) -> bool {
        self.inner
            .lock_scope()
            .as_ref()
            .is_some_and(|active| !active.token.is_cancelled())
    }

    /// Returns the current execution scope.
    ///
    /// ### Errors
    /// [`RuntimeError::NotActive`] before `start` or after `dispose`.
    pub fn scope(&self) -> Result<CancellationToken, RuntimeError> {
        match self.inner.lock_scope().as_ref() {
            Some(active) if !active.token.is_cancelled() => Ok(active.token.clone()),
            _ => Err(RuntimeError::NotActive {
                host: self.inner.name.to_string(),
            }),
        }
    }

    /// Returns a builder for a watch context owned by this host.
    ///
    /// The context inherits the host's config and error mapper, gets a name from the
    /// host's sequence unless one is set, and is torn down with the host's scope.
    pub fn watch_context<R: Clone + Send + 'static>(&self) -> WatchContextBuilder<R> {
        WatchContextBuilder::new(
            self.inner.cfg.clone(),
            self.inner.error_mapper.clone(),
            Some(Arc::clone(&self.inner.names)),
            Some(Arc::clone(&self.inner.registry)),
        )
    }

    /// Sorted names of live host-owned contexts.
    pub fn contexts(&self) -> Vec<String> {
        self.inner.registry.list()
    }

    /// Runs ad hoc background work under the host scope.
    ///
    /// Failures and panics are published to the uncaught sink; cancellation is not.
    ///
    /// ### Errors
    /// [`RuntimeError::NotActive`] when the host has no scope.
    pub fn launch<F, Fut>(
        &self,
        origin: impl Into<Arc<str>>,
        work: F,
    ) -> Result<JoinHandle<()>, RuntimeError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let token = self.scope()?;
        let origin = origin.into();
        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(async move {
            if let Outcome::Failed(err) = run_once(work, &token, None).await {
                inner.report(origin, err).await;
            }
        }))
    }

    /// Publishes a failure to the uncaught sink directly.
    pub async fn report(&self, origin: impl Into<Arc<str>>, err: JobError) {
        self.inner.report(origin.into(), err).await;
    }

    /// Subscribes to uncaught failures.
    ///
    /// With `replay_last = true` the most recent failure (if any) is delivered first.
    pub fn uncaught_errors(&self, replay_last: bool) -> Subscription<UncaughtError> {
        self.inner.uncaught.subscribe(replay_last)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.inner.name)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Host`].
pub struct HostBuilder {
    cfg: Config,
    name: Arc<str>,
    error_mapper: Option<ErrorMapper>,
}

impl HostBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            name: Arc::from("host"),
            error_mapper: None,
        }
    }

    /// Sets the host name (also the prefix of generated context names).
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the global error mapper used by contexts without their own.
    pub fn error_mapper<F>(mut self, f: F) -> Self
    where
        F: Fn(JobError) -> JobError + Send + Sync + 'static,
    {
        self.error_mapper = Some(Arc::new(f));
        self
    }

    /// Builds the host. It is inactive until [`Host::start`].
    pub fn build(self) -> Host {
        let uncaught = ReplayChannel::new(
            None,
            self.cfg.uncaught_capacity(),
            Arc::new(tokio::sync::Notify::new()),
        );
        Host {
            inner: Arc::new(HostInner {
                names: Arc::new(NameSequence::new(Arc::clone(&self.name))),
                name: self.name,
                cfg: self.cfg,
                scope: Mutex::new(None),
                generation: AtomicU64::new(0),
                uncaught,
                error_mapper: self.error_mapper,
                registry: Arc::new(Registry::new()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Host {
        Host::builder(Config::default()).name("unit").build()
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let host = host();
        host.start(None).expect("first start");
        assert_eq!(
            host.start(None),
            Err(RuntimeError::AlreadyActive {
                host: "unit".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_scope_requires_start() {
        let host = host();
        assert!(matches!(host.scope(), Err(RuntimeError::NotActive { .. })));
        host.start(None).expect("start");
        let scope = host.scope().expect("active scope");
        host.dispose();
        assert!(scope.is_cancelled());
        assert!(!host.is_active());
    }

    #[tokio::test]
    async fn test_restart_after_dispose() {
        let host = host();
        host.start(None).expect("start");
        host.dispose();
        host.start(None).expect("restart");
        assert!(host.is_active());
    }

    #[tokio::test]
    async fn test_generated_context_names_use_host_prefix() {
        let host = host();
        let a = host.watch_context::<u8>().build();
        let b = host.watch_context::<u8>().name("explicit").build();
        let c = host.watch_context::<u8>().build();
        assert_eq!(a.name(), "unit-0");
        assert_eq!(b.name(), "explicit");
        assert_eq!(c.name(), "unit-1");
        assert_eq!(host.contexts(), vec!["explicit", "unit-0", "unit-1"]);
    }
}
