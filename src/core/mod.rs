//! Runtime core: single-flight execution and host lifecycle.
//!
//! The public API from this module is [`WatchContext`] (one job engine per context)
//! and [`Host`] (the owning scope for contexts and ad hoc work).
//!
//! Internal modules:
//! - [`runner`]: executes one run with timeout, cancellation and panic capture;
//! - [`gate`]: waits for subscriber thresholds of a lazy start;
//! - [`context`]: single-flight engine publishing state and results;
//! - [`host`]: scope creation, teardown and the uncaught-error sink;
//! - [`registry`]: weak set of host-owned contexts;
//! - [`naming`]: generated context names.

mod context;
mod gate;
mod handle;
mod host;
mod naming;
mod registry;
mod runner;

pub use context::{ErrorMapper, WatchContext, WatchContextBuilder};
pub use handle::{ExitReason, JobHandle};
pub use host::{Host, HostBuilder};
