//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for label recognition.
//! After repeated OCR failures new scans fail fast until the reset timeout
//! elapses, instead of each one waiting out a full timeout.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::ocr_config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for OCR operations
///
/// ```text
/// CLOSED ──failures ≥ threshold──► OPEN
///    ▲                               │
///    └──────── reset timeout ────────┘
/// ```
///
/// The first call to [`CircuitBreaker::is_open`] after the reset timeout clears
/// the failure count, letting one scan through to test the engine again.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tummy_scan::ocr_config::RecoveryConfig;
    /// use tummy_scan::circuit_breaker::CircuitBreaker;
    ///
    /// let circuit_breaker = CircuitBreaker::new(&RecoveryConfig::default());
    /// assert!(!circuit_breaker.is_open());
    /// ```
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: config.circuit_breaker_threshold,
            reset_timeout: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    /// Check if circuit breaker is open (blocking requests)
    ///
    /// Returns `true` when the failure count reached the threshold and the
    /// reset timeout has not elapsed since the last failure.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock();

        if state.failure_count < self.threshold {
            return false;
        }

        match state.last_failure_time {
            Some(last_time) if last_time.elapsed() < self.reset_timeout => true,
            _ => {
                *state = BreakerState::default();
                false
            }
        }
    }

    /// Record a failure to increment the failure counter
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
    }

    /// Record a success to reset the failure counter
    pub fn record_success(&self) {
        *self.state.lock() = BreakerState::default();
    }

    /// Current consecutive failure count
    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }
}
