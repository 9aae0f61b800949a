//! Scheduling policies.
//!
//! ## Contents
//! - [`StartPolicy`] when a scheduled run begins (eagerly / lazily)
//! - [`LazyStart`]   validated subscriber thresholds for a lazy start
//!
//! ## Quick wiring
//! ```text
//! Task::start_with(args, StartPolicy)
//!      └─► WatchContext::execute_in(scope, policy, body)
//!           - Eagerly → single-flight check now, body runs right away
//!           - Lazily  → gate waits on subscriber counts, then single-flight check
//! ```

mod start;

pub use start::{LazyStart, StartPolicy};
