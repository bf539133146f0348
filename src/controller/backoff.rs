//! # Fibonacci Backoff
//!
//! Progressive retry delays for primaries whose reconciliation keeps failing.
//! The sequence grows more slowly than exponential backoff, so a primary
//! blocked on something the user has to fix is retried often at first and
//! then settles at the cap.
//!
//! Calculations are done in minutes: 1m, 1m, 2m, 3m, 5m, 8m, 10m (max).
//!
//! ```rust
//! use app_operator::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(1, 10);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 120);
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Delay used when the tracker's state cannot be read
const FALLBACK_BACKOFF_SECS: u64 = 60;

/// A failing primary is retried at least once per cap; after this many caps
/// without a failure its state belongs to a deleted or recovered primary
const IDLE_CAPS_BEFORE_EVICTION: u32 = 3;

#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// Sequence starting at `min_minutes` and capped at `max_minutes`
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Current delay in seconds; advances the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_minutes * 60;
        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = std::cmp::min(next_minutes, self.max_minutes);
        result_seconds
    }

    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

/// Backoff state of one primary
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
    pub last_failure: Instant,
}

impl BackoffState {
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
            last_failure: Instant::now(),
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
        self.last_failure = Instant::now();
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Per-primary backoff states, keyed by `kind/namespace/name`
///
/// Failures of one primary never delay the retries of another. Primaries
/// deleted while failing are never reconciled again, so states idle for
/// longer than a few backoff caps are evicted on the next failure.
#[derive(Debug)]
pub struct BackoffTracker {
    min_minutes: u64,
    max_minutes: u64,
    idle_after: Duration,
    states: Mutex<HashMap<String, BackoffState>>,
}

impl BackoffTracker {
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        let cap = Duration::from_secs(max_minutes.max(1) * 60);
        Self {
            min_minutes,
            max_minutes,
            idle_after: cap * IDLE_CAPS_BEFORE_EVICTION,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Override how long a state may sit without failures before eviction
    #[must_use]
    pub fn with_idle_limit(mut self, idle_after: Duration) -> Self {
        self.idle_after = idle_after;
        self
    }

    /// Record a failure of `key` and return the delay before its retry,
    /// together with the number of consecutive failures
    pub fn record_failure(&self, key: &str) -> (Duration, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                let idle_after = self.idle_after;
                states.retain(|tracked, state| {
                    tracked == key || state.last_failure.elapsed() < idle_after
                });
                let state = states
                    .entry(key.to_string())
                    .or_insert_with(|| BackoffState::new(self.min_minutes, self.max_minutes));
                state.increment_error();
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                (Duration::from_secs(FALLBACK_BACKOFF_SECS), 0)
            }
        }
    }

    /// Forget the failures of `key`; returns whether it had any
    pub fn reset(&self, key: &str) -> bool {
        match self.states.lock() {
            Ok(mut states) => states
                .remove(key)
                .is_some_and(|state| state.error_count > 0),
            Err(e) => {
                warn!("Failed to lock backoff states: {}", e);
                false
            }
        }
    }

    /// Number of primaries with recorded failures
    pub fn tracked(&self) -> usize {
        self.states.lock().map(|states| states.len()).unwrap_or(0)
    }

    pub fn error_count(&self, key: &str) -> u32 {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(key).map(|s| s.error_count))
            .unwrap_or(0)
    }
}
