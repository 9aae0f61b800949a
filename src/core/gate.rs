//! # Lazy-start gate.
//!
//! Suspends a scheduled run until the subscriber thresholds of a [`LazyStart`] are met.
//! Every subscribe/unsubscribe on the context's channels notifies a shared [`Notify`];
//! the gate re-checks the counts on each wake-up instead of polling.

use tokio::sync::Notify;

use crate::policies::LazyStart;

/// Waits until `counts()` satisfies `lazy`.
///
/// `counts` returns `(state_subscribers, result_subscribers)`.
pub(crate) async fn wait_for_subscribers<C>(lazy: LazyStart, changed: &Notify, counts: C)
where
    C: Fn() -> (usize, usize),
{
    loop {
        let notified = changed.notified();
        tokio::pin!(notified);
        // Register before reading the counts so a change in between is not missed.
        notified.as_mut().enable();

        let (state, results) = counts();
        if lazy.is_satisfied(state, results) {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_gate_opens_on_notification() {
        let changed = Arc::new(Notify::new());
        let results = Arc::new(AtomicUsize::new(0));
        let lazy = LazyStart::new(0, 1).expect("valid thresholds");

        let gate = {
            let changed = Arc::clone(&changed);
            let results = Arc::clone(&results);
            tokio::spawn(async move {
                wait_for_subscribers(lazy, &changed, || (0, results.load(Ordering::SeqCst)))
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert!(!gate.is_finished());

        results.store(1, Ordering::SeqCst);
        changed.notify_waiters();
        gate.await.expect("gate task");
    }

    #[tokio::test]
    async fn test_already_satisfied_returns_immediately() {
        let changed = Notify::new();
        let lazy = LazyStart::new(2, 0).expect("valid thresholds");
        wait_for_subscribers(lazy, &changed, || (2, 0)).await;
    }
}
