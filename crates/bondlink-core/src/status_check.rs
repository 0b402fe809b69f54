// ============================================
// File: crates/bondlink-core/src/status_check.rs
// ============================================
//! # Status Check
//!
//! ## Main Functionality
//! Liveness challenge between two paired devices.
//!
//! ```text
//! Initiator                              Responder
//!   │ StatusCheck [r_local (16)]             │
//!   │ ─────────────────────────────────────► │
//!   │   StatusCheckResponse [r_local | r_own]│
//!   │ ◄───────────────────────────────────── │
//!   │ echo == r_local ?                      │
//! ```
//!
//! A missing, malformed or unsolicited response is a status-check
//! failure, as is no response before the deadline.
//!
//! ## Last Modified
//! v0.1.0 - Initial status check

use std::time::{Duration, Instant};

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use bondlink_common::Deadline;

use crate::crypto::digest::digests_match;
use crate::error::{CoreError, Result};
use crate::protocol::CHALLENGE_SIZE;

/// Challenge/response state, overwritten each cycle.
#[derive(Debug, Clone)]
pub struct StatusCheckState {
    local_challenge: Option<[u8; CHALLENGE_SIZE]>,
    remote_challenge: Option<[u8; CHALLENGE_SIZE]>,
    deadline: Deadline,
}

impl StatusCheckState {
    /// Creates an idle state with the given response budget.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            local_challenge: None,
            remote_challenge: None,
            deadline: Deadline::new(timeout),
        }
    }

    /// Returns `true` while a challenge awaits its answer.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.local_challenge.is_some()
    }

    /// Last challenge received from the peer.
    #[must_use]
    pub const fn remote_challenge(&self) -> Option<&[u8; CHALLENGE_SIZE]> {
        self.remote_challenge.as_ref()
    }

    /// Generates a fresh challenge without arming anything.
    #[must_use]
    pub fn challenge() -> [u8; CHALLENGE_SIZE] {
        let mut challenge = [0u8; CHALLENGE_SIZE];
        OsRng.fill_bytes(&mut challenge);
        challenge
    }

    /// Makes `challenge` the pending one and arms the deadline.
    pub fn arm(&mut self, challenge: [u8; CHALLENGE_SIZE], now: Instant) {
        self.local_challenge = Some(challenge);
        self.deadline.arm(now);
    }

    /// Builds the answer to a peer challenge: echo followed by our random.
    ///
    /// # Errors
    /// `StatusCheck` if the challenge has the wrong size.
    pub fn answer(&mut self, challenge: &[u8]) -> Result<[u8; CHALLENGE_SIZE * 2]> {
        let challenge: [u8; CHALLENGE_SIZE] =
            challenge.try_into().map_err(|_| CoreError::StatusCheck {
                reason: "challenge has wrong size",
            })?;
        self.remote_challenge = Some(challenge);

        let mut out = [0u8; CHALLENGE_SIZE * 2];
        out[..CHALLENGE_SIZE].copy_from_slice(&challenge);
        OsRng.fill_bytes(&mut out[CHALLENGE_SIZE..]);
        Ok(out)
    }

    /// Checks a response against the pending challenge.
    ///
    /// The pending challenge is consumed whether or not it matches.
    ///
    /// # Errors
    /// `StatusCheck` when nothing is pending, the size is wrong or the
    /// echo differs.
    pub fn verify_response(&mut self, response: &[u8]) -> Result<()> {
        let Some(expected) = self.local_challenge.take() else {
            return Err(CoreError::StatusCheck {
                reason: "no challenge pending",
            });
        };
        self.deadline.disarm();

        if response.len() != CHALLENGE_SIZE * 2 {
            return Err(CoreError::StatusCheck {
                reason: "response has wrong size",
            });
        }
        if !digests_match(&expected, &response[..CHALLENGE_SIZE]) {
            return Err(CoreError::StatusCheck {
                reason: "echo does not match challenge",
            });
        }
        let mut peer = [0u8; CHALLENGE_SIZE];
        peer.copy_from_slice(&response[CHALLENGE_SIZE..]);
        self.remote_challenge = Some(peer);
        debug!("Status check answered");
        Ok(())
    }

    /// Reports a missing response once its deadline passed.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<CoreError> {
        if self.deadline.expire(now) {
            self.local_challenge = None;
            Some(CoreError::StatusCheck {
                reason: "no response within timeout",
            })
        } else {
            None
        }
    }

    /// Forgets both challenges.
    pub fn clear(&mut self) {
        self.local_challenge = None;
        self.remote_challenge = None;
        self.deadline.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(state: &mut StatusCheckState, now: Instant) -> [u8; CHALLENGE_SIZE] {
        let challenge = StatusCheckState::challenge();
        state.arm(challenge, now);
        challenge
    }

    #[test]
    fn test_challenge_roundtrip() {
        let mut a = StatusCheckState::new(Duration::from_secs(1));
        let mut b = StatusCheckState::new(Duration::from_secs(1));

        let challenge = issue(&mut a, Instant::now());
        assert!(a.is_pending());
        let response = b.answer(&challenge).unwrap();
        assert_eq!(&response[..CHALLENGE_SIZE], &challenge);
        assert!(a.verify_response(&response).is_ok());
        assert!(!a.is_pending());
        assert_eq!(a.remote_challenge().unwrap(), &response[CHALLENGE_SIZE..]);
    }

    #[test]
    fn test_mismatch_and_unsolicited() {
        let mut a = StatusCheckState::new(Duration::from_secs(1));
        assert!(matches!(
            a.verify_response(&[0u8; 32]),
            Err(CoreError::StatusCheck { .. })
        ));

        let challenge = issue(&mut a, Instant::now());
        let mut bad = [0u8; 32];
        bad[..16].copy_from_slice(&challenge);
        bad[0] ^= 1;
        assert!(a.verify_response(&bad).is_err());
        // Consumed by the failed attempt.
        assert!(!a.is_pending());

        issue(&mut a, Instant::now());
        assert!(a.verify_response(&[0u8; 20]).is_err());
    }

    #[test]
    fn test_answer_wrong_size() {
        let mut b = StatusCheckState::new(Duration::from_secs(1));
        assert!(b.answer(&[0u8; 15]).is_err());
    }

    #[test]
    fn test_timeout_reported_once() {
        let mut a = StatusCheckState::new(Duration::from_millis(10));
        let start = Instant::now();
        issue(&mut a, start);

        assert!(a.poll_timeout(start).is_none());
        let later = start + Duration::from_millis(20);
        assert!(matches!(
            a.poll_timeout(later),
            Some(CoreError::StatusCheck { .. })
        ));
        assert!(a.poll_timeout(later + Duration::from_secs(1)).is_none());
        assert!(!a.is_pending());
    }
}
