//! # Replay channel: latest-value cache plus per-subscriber bounded queues.
//!
//! [`ReplayChannel`] backs every observable sequence in the crate: the job state,
//! the job results and the host's uncaught-error sink.
//!
//! ## Architecture
//! ```text
//! stage(v)   (sync, under lock)
//!   ├─► latest = v
//!   └─► Staged { targets = current subscribers, turn after the previous staged value }
//!
//! Staged::deliver(abort)   (async)
//!   ├─► wait for the previous staged value to finish delivering
//!   └─► [queue S1] ──► Subscription 1
//!       [queue S2] ──► Subscription 2
//!       [queue SN] ──► Subscription N
//!
//! subscribe(replay=true)  ──► new queue seeded with `latest` (if any)
//! subscribe(replay=false) ──► new empty queue
//! ```
//!
//! ## Rules
//! - **Ordered delivery**: values reach every subscriber in staging order.
//! - **No conflation**: each queue holds `capacity` values; a full queue makes the
//!   deliverer wait (backpressure) until the subscriber catches up or `abort` fires.
//!   After `abort` only queues with free room receive the value.
//! - **Replay exactly once**: a subscriber either gets a value from the replay slot or
//!   from its queue, never both.
//! - **Pruning**: dropped subscriptions are removed on the next stage or count.
//! - **Disconnect**: ends every current subscription (after its buffered values) and
//!   releases a deliverer blocked on a stuck subscriber. The channel stays usable.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::subscription::Subscription;

/// Upper bound for a single subscriber queue.
const MAX_QUEUE: usize = 1 << 20;

struct Shared<T> {
    latest: Option<T>,
    senders: Vec<mpsc::Sender<T>>,
    generation: CancellationToken,
    /// Cancelled once the most recently staged value is delivered (or abandoned).
    tail: CancellationToken,
}

/// Latest-value cache with fan-out to per-subscriber bounded queues.
pub(crate) struct ReplayChannel<T> {
    shared: Mutex<Shared<T>>,
    capacity: usize,
    changed: Arc<Notify>,
}

/// A value already stored as the latest, waiting to be fanned out.
///
/// Dropping it without [`deliver`](Staged::deliver) skips the fan-out but keeps the
/// delivery order of later values intact.
#[must_use = "a staged value reaches no subscriber unless delivered"]
pub(crate) struct Staged<T> {
    value: T,
    targets: Vec<mpsc::Sender<T>>,
    generation: CancellationToken,
    prev: CancellationToken,
    done: DropGuard,
}

impl<T: Clone + Send + 'static> ReplayChannel<T> {
    /// Creates a channel with an optional initial replay value.
    ///
    /// `capacity` is the per-subscriber queue size (clamped to `1..=MAX_QUEUE`).
    /// `changed` is notified whenever a subscription is created or dropped.
    pub(crate) fn new(initial: Option<T>, capacity: usize, changed: Arc<Notify>) -> Self {
        let tail = CancellationToken::new();
        tail.cancel();
        Self {
            shared: Mutex::new(Shared {
                latest: initial,
                senders: Vec::new(),
                generation: CancellationToken::new(),
                tail,
            }),
            capacity: capacity.clamp(1, MAX_QUEUE),
            changed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        // A panic while holding this lock cannot leave `Shared` half-updated.
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a new subscriber.
    ///
    /// With `replay = true` the subscriber first receives the latest value (if any).
    pub(crate) fn subscribe(&self, replay: bool) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(self.capacity);
        {
            let mut shared = self.lock();
            if replay {
                if let Some(v) = shared.latest.clone() {
                    // Fresh queue with capacity >= 1.
                    let _ = tx.try_send(v);
                }
            }
            shared.senders.push(tx);
        }
        self.changed.notify_waiters();
        Subscription::new(rx, Arc::clone(&self.changed))
    }

    /// Stores `value` as the latest and snapshots the current subscribers.
    pub(crate) fn stage(&self, value: T) -> Staged<T> {
        Self::stage_locked(&mut self.lock(), value)
    }

    /// Like [`stage`](Self::stage), but only when `accept(latest)` holds.
    ///
    /// The check and the store happen under one lock.
    pub(crate) fn stage_if<F>(&self, accept: F, value: T) -> Option<Staged<T>>
    where
        F: FnOnce(Option<&T>) -> bool,
    {
        let mut shared = self.lock();
        if !accept(shared.latest.as_ref()) {
            return None;
        }
        Some(Self::stage_locked(&mut shared, value))
    }

    fn stage_locked(shared: &mut Shared<T>, value: T) -> Staged<T> {
        shared.latest = Some(value.clone());
        shared.senders.retain(|tx| !tx.is_closed());
        let done = CancellationToken::new();
        let prev = std::mem::replace(&mut shared.tail, done.clone());
        Staged {
            value,
            targets: shared.senders.clone(),
            generation: shared.generation.clone(),
            prev,
            done: done.drop_guard(),
        }
    }

    /// Stages `value` and delivers it to every current subscriber.
    ///
    /// Waits while a subscriber queue is full; returns once every live subscriber
    /// has the value queued, or the channel was disconnected meanwhile.
    pub(crate) async fn publish(&self, value: T) {
        self.stage(value).deliver(&CancellationToken::new()).await;
    }

    /// Stages `value` and delivers it, waiting on full queues only until `abort` fires.
    pub(crate) async fn publish_until(&self, value: T, abort: &CancellationToken) {
        self.stage(value).deliver(abort).await;
    }

    /// Returns the most recently staged value (or the initial one).
    pub(crate) fn latest(&self) -> Option<T> {
        self.lock().latest.clone()
    }

    /// Number of live subscriptions.
    pub(crate) fn subscriber_count(&self) -> usize {
        let mut shared = self.lock();
        shared.senders.retain(|tx| !tx.is_closed());
        shared.senders.len()
    }

    /// Ends every current subscription. The latest value is kept for future subscribers.
    pub(crate) fn disconnect(&self) {
        {
            let mut shared = self.lock();
            shared.senders.clear();
            shared.generation.cancel();
            shared.generation = CancellationToken::new();
        }
        self.changed.notify_waiters();
    }
}

impl<T: Clone + Send + 'static> Staged<T> {
    /// Fans the value out to the subscribers captured at staging time.
    ///
    /// Runs after the previously staged value has been delivered. Once `abort` is
    /// cancelled, full queues are skipped instead of awaited.
    pub(crate) async fn deliver(self, abort: &CancellationToken) {
        let Staged {
            value,
            targets,
            generation,
            prev,
            done,
        } = self;

        tokio::select! {
            biased;
            _ = prev.cancelled() => {}
            _ = generation.cancelled() => return,
            _ = abort.cancelled() => {
                // Keep later values behind the predecessor without holding the caller.
                tokio::spawn(async move {
                    tokio::select! {
                        _ = prev.cancelled() => {}
                        _ = generation.cancelled() => {}
                    }
                    drop(done);
                });
                return;
            }
        }

        for tx in targets {
            let value = match tx.try_send(value.clone()) {
                Err(TrySendError::Full(v)) if !abort.is_cancelled() => v,
                _ => continue,
            };
            tokio::select! {
                biased;
                _ = generation.cancelled() => break,
                _ = abort.cancelled() => {}
                _ = tx.send(value) => {}
            }
        }
        drop(done);
    }
}
