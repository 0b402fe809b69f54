// ============================================
// File: crates/bondlink-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! One-shot deadlines for the transaction and status-check timers.
//!
//! ## Main Functionality
//! - `Deadline`: Armable one-shot deadline evaluated against a caller clock
//!
//! ## ⚠️ Important Note for Next Developer
//! - `Deadline` never reads the clock itself; callers pass `now` so the
//!   controller stays deterministic under test
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::time::{Duration, Instant};

// ============================================
// Deadline
// ============================================

/// One-shot deadline.
///
/// `arm` starts (or restarts) the budget, `expire` reports the expiry
/// exactly once and disarms.
///
/// # Example
/// ```
/// use bondlink_common::time::Deadline;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut deadline = Deadline::new(Duration::from_millis(10));
/// deadline.arm(start);
/// assert!(!deadline.expire(start));
/// assert!(deadline.expire(start + Duration::from_millis(10)));
/// assert!(!deadline.expire(start + Duration::from_millis(20)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    budget: Duration,
    at: Option<Instant>,
}

impl Deadline {
    /// Creates a disarmed deadline with the given budget.
    #[must_use]
    pub const fn new(budget: Duration) -> Self {
        Self { budget, at: None }
    }

    /// Returns the configured budget.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// Arms the deadline at `now + budget`.
    pub fn arm(&mut self, now: Instant) {
        self.at = Some(now + self.budget);
    }

    /// Disarms without reporting.
    pub fn disarm(&mut self) {
        self.at = None;
    }

    /// Returns `true` while armed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Returns `true` once when `now` has reached the deadline.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.at {
            Some(at) if now >= at => {
                self.at = None;
                true
            }
            _ => false,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_reports_once() {
        let start = Instant::now();
        let mut deadline = Deadline::new(Duration::from_secs(2));
        assert!(!deadline.expire(start + Duration::from_secs(10)));

        deadline.arm(start);
        assert!(deadline.is_armed());
        assert!(!deadline.expire(start + Duration::from_secs(1)));
        assert!(deadline.expire(start + Duration::from_secs(3)));
        assert!(!deadline.is_armed());
        assert!(!deadline.expire(start + Duration::from_secs(4)));
    }

    #[test]
    fn test_deadline_rearm_extends() {
        let start = Instant::now();
        let mut deadline = Deadline::new(Duration::from_secs(2));
        deadline.arm(start);
        deadline.arm(start + Duration::from_secs(1));
        assert!(!deadline.expire(start + Duration::from_secs(2)));
        assert!(deadline.expire(start + Duration::from_secs(3)));

        deadline.arm(start);
        deadline.disarm();
        assert!(!deadline.expire(start + Duration::from_secs(10)));
    }
}
