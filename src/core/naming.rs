//! Default names for watch contexts.
//!
//! A [`Host`](crate::Host) owns a [`NameSequence`] and numbers its own contexts;
//! standalone contexts draw from one process-wide atomic counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static STANDALONE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Monotonic name generator: `{prefix}-0`, `{prefix}-1`, ...
#[derive(Debug)]
pub(crate) struct NameSequence {
    prefix: Arc<str>,
    next: AtomicU64,
}

impl NameSequence {
    pub(crate) fn new(prefix: impl Into<Arc<str>>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }

    pub(crate) fn next_name(&self) -> Arc<str> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix).into()
    }
}

/// Next name for a context created outside any host.
pub(crate) fn standalone_name() -> Arc<str> {
    let n = STANDALONE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("watch-{n}").into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_scoped_to_owner() {
        let a = NameSequence::new("billing");
        let b = NameSequence::new("search");
        assert_eq!(&*a.next_name(), "billing-0");
        assert_eq!(&*a.next_name(), "billing-1");
        assert_eq!(&*b.next_name(), "search-0");
    }

    #[test]
    fn test_standalone_names_are_unique() {
        assert_ne!(standalone_name(), standalone_name());
    }
}
