//! # Example: basic
//!
//! One watch context, one task, two observers.
//!
//! Demonstrates how to:
//! - Bind a one-argument body to a [`WatchContext`] with [`Task1`].
//! - Observe the state stream and the success/error views.
//! - See a second `start` rejected while a run is in flight.
//! - Cancel a run through its [`JobHandle`](jobwatch::JobHandle).
//!
//! ## Flow
//! ```text
//! Task1::start(n) ──► WatchContext::execute_in(scope, Eagerly, body)
//!     ├─► publish Running
//!     ├─► body(n, token)
//!     ├─► publish Ok(v) / Err(e)
//!     └─► publish Idle
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example basic
//! ```

use std::time::Duration;

use futures::StreamExt;
use jobwatch::{JobError, JobStream, JobStreamExt, Task1, WatchContext};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. A root scope and a context owned by nobody but us
    let scope = CancellationToken::new();
    let ctx = WatchContext::<u64>::named("fib");

    // 2. Slow fibonacci that honours cancellation between steps
    let fib = Task1::new(scope.clone(), ctx, |n: u64, token| async move {
        if n > 90 {
            return Err(JobError::fail(format!("{n} overflows u64")));
        }
        let (mut a, mut b) = (0u64, 1u64);
        for _ in 0..n {
            if token.is_cancelled() {
                return Err(JobError::Canceled);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            (a, b) = (b, a + b);
        }
        Ok(a)
    });

    // 3. Observers
    let mut state = fib.state();
    tokio::spawn(async move {
        while let Some(s) = state.next().await {
            println!("[state] {}", s.as_label());
        }
    });
    let mut values = fib.success_results(false);
    let mut errors = fib.errors(false);

    // 4. A run, and a rejected concurrent start
    let running = fib.start(10)?;
    if let Err(e) = fib.start(20) {
        println!("[start] rejected: {}", e.as_message());
    }
    running.join().await?;
    println!("[value] fib(10) = {:?}", values.next().await);

    // 5. A failing run
    fib.start(100)?.join().await?;
    println!("[error] {:?}", errors.next().await);

    // 6. A cancelled run publishes nothing
    let long = fib.start(80)?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    long.cancel();
    println!("[cancel] exit = {}", long.join().await?.as_label());

    scope.cancel();
    Ok(())
}
