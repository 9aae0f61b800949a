//! # Example: host_lifecycle
//!
//! Host-owned contexts, lazy start, uncaught failures and teardown.
//!
//! Demonstrates how to:
//! - Start a [`Host`] under a parent token and build contexts from it.
//! - Defer a run until someone observes it with [`StartPolicy::lazily`].
//! - Collect failures of ad hoc work via [`Host::launch`] and [`Host::uncaught_errors`].
//! - End every stream at once by cancelling the parent.
//!
//! ## Flow
//! ```text
//! parent token ──► Host::start(Some(parent))
//!     ├─► watch_context() ──► Task0 (lazy: waits for a result subscriber)
//!     ├─► launch("refresh", ..) ──► failure ──► uncaught sink
//!     └─► parent.cancel() ──► runs cancelled, streams end
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=jobwatch=debug cargo run --example host_lifecycle
//! ```

use std::time::Duration;

use futures::StreamExt;
use jobwatch::{Config, Host, JobError, JobStream, JobStreamExt, StartPolicy, Task0};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Host with a global error mapper and a default per-run timeout
    let cfg = Config {
        timeout: Duration::from_secs(2),
        ..Config::default()
    };
    let host = Host::builder(cfg)
        .name("demo")
        .error_mapper(|e| JobError::fail(format!("[demo] {}", e.as_message())))
        .build();

    let parent = CancellationToken::new();
    host.start(Some(&parent))?;

    // 2. A lazy report: it runs once somebody listens for results
    let report = Task0::new(host.clone(), host.watch_context().name("report").build(), |_t| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok("42 rows".to_string())
    });
    let pending = report.start_with(StartPolicy::lazily(0, 1)?)?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("[report] running before observed: {}", report.context().is_running());

    let mut rows = report.success_results(false);
    println!("[report] {:?}", rows.next().await);
    pending.join().await?;

    // 3. Ad hoc background work that fails
    let mut uncaught = host.uncaught_errors(false);
    host.launch("refresh", |_t| async { Err(JobError::fail("upstream unavailable")) })?
        .await?;
    if let Some(ev) = uncaught.next().await {
        println!("[uncaught] #{} {:?}: {}", ev.seq, ev.origin, ev.error);
    }

    // 4. A stuck job, torn down with the parent
    let stuck = Task0::new(host.clone(), host.watch_context::<()>().build(), |token| async move {
        token.cancelled().await;
        Ok(())
    });
    let mut state = stuck.state();
    let handle = stuck.start()?;
    println!("[contexts] {:?}", host.contexts());

    parent.cancel();
    println!("[stuck] exit = {}", handle.join().await?.as_label());
    while let Some(s) = state.next().await {
        println!("[stuck] state {}", s.as_label());
    }
    println!("[host] active = {}", host.is_active());
    Ok(())
}
