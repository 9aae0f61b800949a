//! # jobwatch
//!
//! **jobwatch** runs async jobs one at a time per context and makes their activity
//! observable: a state stream (`Idle` / `Running`) and a result stream with
//! last-value replay.
//!
//! It is a building block for UI view-models, background refreshers and services
//! that must expose "is it running, and what did it last produce" to many observers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Task0<R>    │   │  Task1<A,R>  │   │  Task2<A,B,R>│
//!     │ start()      │   │ start(a)     │   │ start(a, b)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ Scope::token()   │                  │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Host (optional owner)                                            │
//! │  - scope token (child of a parent, if any)                        │
//! │  - error mapper inherited by contexts                             │
//! │  - Registry (weak set of owned contexts)                          │
//! │  - uncaught-error sink (Host::launch / Host::report)              │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ WatchContext │   │ WatchContext │   │ WatchContext │
//!     │ single-flight│   │ single-flight│   │ single-flight│
//!     └┬─────────┬───┘   └┬─────────┬───┘   └┬─────────┬───┘
//!      ▼         ▼        ▼         ▼        ▼         ▼
//!    state    results   state    results   state    results
//!  (replay)  (replay?) (replay)  (replay?) (replay)  (replay?)
//!      │         │
//!      ▼         ▼
//!  per-subscriber bounded queues (backpressure, never conflated)
//! ```
//!
//! ### Lifecycle of one run
//! ```text
//! Task::start(args) ──► WatchContext::execute_in(scope, policy, body)
//!
//!   ├─► Eagerly: claim flight slot, state := Running (busy → Err(AlreadyRunning))
//!   ├─► Lazily:  wait for subscriber thresholds, then claim
//!   ├─► deliver Running
//!   ├─► run_once(body, child token, timeout)
//!   │       ├─ Ok(v)     ──► publish Ok(v)
//!   │       ├─ Err(e)    ──► map error ──► publish Err(e')
//!   │       └─ cancelled ──► (nothing)
//!   └─► release flight slot, state := Idle ──► deliver Idle
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Execution**     | Single-flight runs with cancellation, timeout, panic capture. | [`WatchContext`], [`JobHandle`]             |
//! | **Observation**   | State and result streams, filtered and mapped views.          | [`JobStream`], [`JobStreamExt`]             |
//! | **Tasks**         | Start operations of 0–3 arguments bound to a context.         | [`Task0`], [`Task1`], [`Task2`], [`Task3`]  |
//! | **Policies**      | Eager or subscriber-gated lazy start.                         | [`StartPolicy`], [`LazyStart`]              |
//! | **Ownership**     | Scoped lifetime, global error mapping, uncaught failures.     | [`Host`], [`UncaughtError`]                 |
//! | **Errors**        | Typed errors for call-site misuse and for job failures.       | [`RuntimeError`], [`JobError`]              |
//! | **Configuration** | Buffer sizes and default per-run timeout.                     | [`Config`]                                  |
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use jobwatch::{Config, Host, JobState, JobStream, JobStreamExt, Task1};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Host::builder(Config::default()).name("app").build();
//!     host.start(None)?;
//!
//!     let ctx = host.watch_context::<String>().name("greeter").build();
//!     let greet = Task1::new(host.clone(), ctx, |who: String, _token| async move {
//!         Ok(format!("hello, {who}"))
//!     });
//!
//!     let mut state = greet.state();
//!     let mut greetings = greet.success_results(false);
//!
//!     greet.start("world".to_string())?.join().await?;
//!
//!     assert_eq!(state.next().await, Some(JobState::Idle));
//!     assert_eq!(state.next().await, Some(JobState::Running));
//!     assert_eq!(greetings.next().await, Some("hello, world".to_string()));
//!     assert_eq!(state.next().await, Some(JobState::Idle));
//!
//!     host.dispose();
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod job;
mod policies;
mod tasks;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{
    ErrorMapper, ExitReason, Host, HostBuilder, JobHandle, WatchContext, WatchContextBuilder,
};
pub use error::{JobError, RuntimeError};
pub use events::{Subscription, UncaughtError};
pub use job::{JobResult, JobState, JobStream, JobStreamExt, MapErrors, MapSuccessResults};
pub use policies::{LazyStart, StartPolicy};
pub use tasks::{Scope, Task, Task0, Task1, Task2, Task3};
