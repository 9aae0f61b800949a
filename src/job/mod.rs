//! # Job data model and observation contract.
//!
//! - [`JobState`] - `Idle` / `Running`
//! - [`JobResult`] - outcome of one completed run
//! - [`JobStream`] / [`JobStreamExt`] - read-only view over state and results

mod state;
mod stream;

pub use state::{JobResult, JobState};
pub use stream::{JobStream, JobStreamExt, MapErrors, MapSuccessResults};
