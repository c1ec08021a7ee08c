//! Retransmission backoff tracking and the duplicate-request response cache.
//! The request side retransmits on a backoff schedule
//! (initial 500ms, doubling, ~8 attempts) until a matching response arrives
//! or the cap is reached; the response side caches the last response sent
//! by message ID, cache size 1.

use std::time::Duration;

use crate::collab::TimerToken;
use crate::config::SessionConfig;

/// A request this session sent and is waiting on a matching response for
#[derive(Debug)]
pub struct PendingRequest {
    /// Message ID the response must echo
    pub message_id: u32,
    /// Encoded request bytes, resent verbatim on each retransmission
    pub raw: Vec<u8>,
    /// Number of retransmissions already sent, 0 for the original send
    pub attempt: u32,
    /// Timer token the retransmission wakeup was scheduled under
    pub timer: TimerToken,
}

impl PendingRequest {
    /// Track a freshly sent request, not yet retransmitted
    pub fn new(message_id: u32, raw: Vec<u8>, timer: TimerToken) -> Self {
        Self { message_id, raw, attempt: 0, timer }
    }

    /// Delay before the next retransmission, doubling per attempt from the
    /// configured initial backoff
    pub fn next_backoff(&self, config: &SessionConfig) -> Duration {
        config.retransmit_initial_backoff.saturating_mul(1u32 << self.attempt.min(30))
    }

    /// Whether [`crate::error::SessionError::Timeout`] should fire instead
    /// of another retransmission
    pub fn attempts_exhausted(&self, config: &SessionConfig) -> bool {
        self.attempt >= config.retransmit_max_attempts
    }
}

/// The single cached response kept for duplicate peer-initiated requests
#[derive(Debug, Clone)]
pub struct ResponseCache {
    message_id: u32,
    response: Vec<u8>,
}

impl ResponseCache {
    /// Record `response` as the answer to `message_id`, evicting whatever
    /// was cached before (cache size 1)
    pub fn new(message_id: u32, response: Vec<u8>) -> Self {
        Self { message_id, response }
    }

    /// The cached response bytes, if `message_id` matches the one cached
    pub fn lookup(&self, message_id: u32) -> Option<&[u8]> {
        (self.message_id == message_id).then_some(self.response.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = SessionConfig::new(vec![], vec![]);
        let mut req = PendingRequest::new(1, vec![], TimerToken(0));
        assert_eq!(req.next_backoff(&config), Duration::from_millis(500));
        req.attempt = 3;
        assert_eq!(req.next_backoff(&config), Duration::from_millis(4000));
    }

    #[test]
    fn cache_only_answers_its_own_message_id() {
        let cache = ResponseCache::new(5, vec![1, 2, 3]);
        assert_eq!(cache.lookup(5), Some([1, 2, 3].as_slice()));
        assert_eq!(cache.lookup(6), None);
    }
}
