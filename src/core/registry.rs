//! # Registry of watch contexts owned by a host.
//!
//! The host keeps weak references to every context it built so that tearing down
//! its scope can end all of their subscriptions.
//!
//! ## Architecture
//! ```text
//! Host::watch_context().build() ──► Registry::register(Weak<dyn Teardown>)
//! Host::dispose() / parent cancel ──► Registry::teardown_all()
//!                                          └─► ctx.teardown() (ends state/result streams)
//! ```
//!
//! ## Rules
//! - The registry never keeps a context alive (weak references only)
//! - Dead entries are pruned on every access

use std::sync::{Mutex, MutexGuard, Weak};

/// Something the host can tear down.
pub(crate) trait Teardown: Send + Sync {
    fn name(&self) -> &str;
    fn teardown(&self);
}

/// Weak registry of host-owned contexts.
#[derive(Default)]
pub(crate) struct Registry {
    contexts: Mutex<Vec<Weak<dyn Teardown>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<dyn Teardown>>> {
        let mut contexts = self.contexts.lock().unwrap_or_else(|p| p.into_inner());
        contexts.retain(|w| w.strong_count() > 0);
        contexts
    }

    pub(crate) fn register(&self, ctx: Weak<dyn Teardown>) {
        self.lock().push(ctx);
    }

    /// Returns sorted names of live contexts.
    pub(crate) fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|c| c.name().to_string())
            .collect();
        names.sort_unstable();
        names
    }

    /// Tears down every live context; returns how many were reached.
    pub(crate) fn teardown_all(&self) -> usize {
        let live: Vec<_> = self.lock().iter().filter_map(Weak::upgrade).collect();
        for ctx in &live {
            ctx.teardown();
        }
        live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Stub {
        name: &'static str,
        torn: AtomicUsize,
    }

    impl Teardown for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn teardown(&self) {
            self.torn.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stub(name: &'static str) -> Arc<Stub> {
        Arc::new(Stub {
            name,
            torn: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_list_is_sorted_and_skips_dropped() {
        let reg = Registry::new();
        let b = stub("b");
        let a = stub("a");
        let gone = stub("gone");
        for p in [&b, &a, &gone] {
            reg.register(Arc::<Stub>::downgrade(p));
        }
        drop(gone);
        assert_eq!(reg.list(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_teardown_reaches_live_contexts() {
        let reg = Registry::new();
        let a = stub("a");
        reg.register(Arc::<Stub>::downgrade(&a));

        assert_eq!(reg.teardown_all(), 1);
        assert_eq!(a.torn.load(Ordering::SeqCst), 1);
    }
}
