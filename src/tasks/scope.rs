//! # Execution scope source.
//!
//! A [`Scope`] hands out the cancellation token that task runs execute under.
//! [`Host`] provides its current scope (and fails while inactive); a bare
//! [`CancellationToken`] is its own scope.

use tokio_util::sync::CancellationToken;

use crate::{core::Host, error::RuntimeError};

/// Source of the token a task run is scheduled under.
///
/// # Stream lifetime
/// Only [`Host`] ends subscriptions when its scope goes away: `dispose` (or a cancelled
/// parent) disconnects every context it owns. Cancelling a bare [`CancellationToken`]
/// scope cancels the runs started under it and nothing else; the contexts stay usable
/// and their state and result streams stay open. Call
/// [`WatchContext::disconnect`](crate::WatchContext::disconnect) to end them.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use jobwatch::Scope;
///
/// let root = CancellationToken::new();
/// let token = root.token().unwrap();
/// root.cancel();
/// assert!(token.is_cancelled());
/// ```
pub trait Scope: Send + Sync + 'static {
    /// Returns the token for the next run.
    fn token(&self) -> Result<CancellationToken, RuntimeError>;
}

impl Scope for CancellationToken {
    fn token(&self) -> Result<CancellationToken, RuntimeError> {
        Ok(self.clone())
    }
}

impl Scope for Host {
    fn token(&self) -> Result<CancellationToken, RuntimeError> {
        self.scope()
    }
}
