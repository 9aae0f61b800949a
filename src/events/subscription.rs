//! # Subscription handle for a replay channel.
//!
//! A [`Subscription`] is a [`Stream`] over one subscriber queue. It ends when the
//! owning channel is dropped or disconnected (buffered values are still delivered
//! first). Dropping it unregisters the subscriber and wakes any lazy-start gate
//! that waits on subscriber counts.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{Notify, mpsc};

/// Live subscription to a state, result or uncaught-error sequence.
#[must_use = "a subscription receives nothing unless it is polled"]
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    changed: Arc<Notify>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(rx: mpsc::Receiver<T>, changed: Arc<Notify>) -> Self {
        Self { rx, changed }
    }

    /// Receives the next value, or `None` once the sequence has ended.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        // Close first so the sender side already reads as closed when counts are re-taken.
        self.rx.close();
        self.changed.notify_waiters();
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
