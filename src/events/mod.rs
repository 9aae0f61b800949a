//! Observable sequences: the replay channel, its subscriptions, and uncaught failures.
//!
//! ## Contents
//! - [`ReplayChannel`] latest-value cache with per-subscriber bounded queues
//! - [`Subscription`] stream handle returned to observers
//! - [`UncaughtError`] payload of the host's uncaught-error sink
//!
//! ## Quick reference
//! - **Publishers**: `WatchContext` (state and results), `Host` (uncaught errors).
//! - **Consumers**: user code through `JobStream` and `Host::uncaught_errors`,
//!   and the lazy-start gate (subscriber counts only).

mod replay;
mod subscription;
mod uncaught;

pub(crate) use replay::{ReplayChannel, Staged};
pub use subscription::Subscription;
pub use uncaught::UncaughtError;
