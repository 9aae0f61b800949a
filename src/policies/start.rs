//! # Start policies for job runs.
//!
//! [`StartPolicy`] determines when a requested run actually begins executing.
//!
//! - [`StartPolicy::Eagerly`] the body runs as soon as the run is scheduled (default).
//! - [`StartPolicy::Lazily`] the body waits until enough observers are attached.
//!
//! ## Choosing the right policy
//!
//! **Fire and observe later** (result kept in the replay slot):
//! ```text
//! StartPolicy::Eagerly            → runs now, late observers use results(true)
//! ```
//!
//! **Start before the observer exists** (first emission must not be missed):
//! ```text
//! StartPolicy::lazily(0, 1)?      → runs once one results subscriber is attached
//! StartPolicy::lazily(1, 1)?      → waits for a state AND a results subscriber
//! ```

use crate::error::RuntimeError;

/// Subscriber thresholds of a lazy start.
///
/// At least one of the two minimums is strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LazyStart {
    min_state_subscribers: usize,
    min_result_subscribers: usize,
}

impl LazyStart {
    /// Creates lazy-start thresholds.
    ///
    /// Returns [`RuntimeError::InvalidStartPolicy`] when both minimums are zero.
    ///
    /// # Example
    /// ```
    /// use jobwatch::{LazyStart, RuntimeError};
    ///
    /// assert!(LazyStart::new(0, 1).is_ok());
    /// assert_eq!(LazyStart::new(0, 0), Err(RuntimeError::InvalidStartPolicy));
    /// ```
    pub fn new(
        min_state_subscribers: usize,
        min_result_subscribers: usize,
    ) -> Result<Self, RuntimeError> {
        if min_state_subscribers == 0 && min_result_subscribers == 0 {
            return Err(RuntimeError::InvalidStartPolicy);
        }
        Ok(Self {
            min_state_subscribers,
            min_result_subscribers,
        })
    }

    /// Minimum number of live `state()` subscribers.
    pub fn min_state_subscribers(&self) -> usize {
        self.min_state_subscribers
    }

    /// Minimum number of live `results()` subscribers (filtered views included).
    pub fn min_result_subscribers(&self) -> usize {
        self.min_result_subscribers
    }

    /// Returns `true` once both thresholds are met.
    #[inline]
    pub fn is_satisfied(&self, state_subscribers: usize, result_subscribers: usize) -> bool {
        state_subscribers >= self.min_state_subscribers
            && result_subscribers >= self.min_result_subscribers
    }
}

/// Policy controlling when a scheduled run starts executing its body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StartPolicy {
    /// Run immediately (default).
    #[default]
    Eagerly,
    /// Run once the subscriber thresholds are met.
    Lazily(LazyStart),
}

impl StartPolicy {
    /// Shorthand for `StartPolicy::Lazily(LazyStart::new(..)?)`.
    pub fn lazily(
        min_state_subscribers: usize,
        min_result_subscribers: usize,
    ) -> Result<Self, RuntimeError> {
        LazyStart::new(min_state_subscribers, min_result_subscribers).map(StartPolicy::Lazily)
    }

    /// Returns `true` for [`StartPolicy::Eagerly`].
    #[inline]
    pub fn is_eager(&self) -> bool {
        matches!(self, StartPolicy::Eagerly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_eager() {
        assert!(StartPolicy::default().is_eager());
    }

    #[test]
    fn test_both_zero_is_rejected() {
        assert_eq!(
            StartPolicy::lazily(0, 0),
            Err(RuntimeError::InvalidStartPolicy)
        );
    }

    #[test]
    fn test_zero_threshold_is_trivially_met() {
        let lazy = LazyStart::new(0, 2).expect("valid thresholds");
        assert!(!lazy.is_satisfied(5, 1));
        assert!(lazy.is_satisfied(0, 2));
        assert!(lazy.is_satisfied(0, 3));
    }

    #[test]
    fn test_both_thresholds_required() {
        let lazy = LazyStart::new(1, 1).expect("valid thresholds");
        assert!(!lazy.is_satisfied(1, 0));
        assert!(!lazy.is_satisfied(0, 1));
        assert!(lazy.is_satisfied(1, 1));
    }
}
