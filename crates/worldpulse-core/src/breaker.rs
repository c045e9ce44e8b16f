//! Permanent circuit breaker for source adapters.
//!
//! Unlike a half-open breaker there is no recovery path: once the
//! consecutive failure count reaches the threshold the breaker opens for
//! the lifetime of the adapter.

use std::sync::{Mutex, PoisonError};

use worldpulse_types::DisabledReason;

/// What a recorded failure did to the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Counted; the breaker is still closed.
    Counted {
        /// Consecutive failures including this one.
        error_count: u32,
    },
    /// This failure reached the threshold and opened the breaker.
    Tripped {
        /// Consecutive failures including this one.
        error_count: u32,
    },
    /// The breaker was already open; nothing changed.
    AlreadyOpen,
}

#[derive(Debug, Default)]
struct BreakerInner {
    consecutive_failures: u32,
    disabled_reason: Option<DisabledReason>,
}

/// Thread-safe consecutive-failure counter with a permanent trip.
#[derive(Debug)]
pub struct CircuitBreaker {
    max_errors: u32,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker that trips on the `max_errors`-th
    /// consecutive failure. A zero threshold is treated as one.
    pub fn new(max_errors: u32) -> Self {
        Self {
            max_errors: max_errors.max(1),
            inner: Mutex::new(BreakerInner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the consecutive failure count.
    ///
    /// Does not re-close an open breaker.
    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    /// Count one failure, opening the breaker when the threshold is hit.
    pub fn record_failure(&self) -> FailureOutcome {
        let mut inner = self.lock();
        if inner.disabled_reason.is_some() {
            return FailureOutcome::AlreadyOpen;
        }
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let error_count = inner.consecutive_failures;
        if error_count >= self.max_errors {
            inner.disabled_reason = Some(DisabledReason::MaxErrors);
            FailureOutcome::Tripped { error_count }
        } else {
            FailureOutcome::Counted { error_count }
        }
    }

    /// Whether polls are still allowed.
    pub fn is_enabled(&self) -> bool {
        self.lock().disabled_reason.is_none()
    }

    /// Consecutive failures since the last success.
    pub fn error_count(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Why the breaker opened, if it has.
    pub fn disabled_reason(&self) -> Option<DisabledReason> {
        self.lock().disabled_reason
    }

    /// The configured threshold.
    pub const fn max_errors(&self) -> u32 {
        self.max_errors
    }
}
