//! # Task wrappers.
//!
//! This module provides the user-facing start operations:
//! - [`Scope`] - source of the cancellation token a run executes under
//! - [`Task`] - body of 0–3 arguments bound to a watch context and a scope
//! - [`Task0`]..[`Task3`] - aliases per argument count

mod scope;
mod task;

pub use scope::Scope;
pub use task::{Task, Task0, Task1, Task2, Task3};
