//! Sliding-window rate limiting.

use nexus_core::config::RateLimitConfig;
use nexus_core::{ChannelKind, SessionId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Sliding-window request counter keyed by (session, channel).
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    buckets: Mutex<HashMap<(SessionId, ChannelKind), VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter from config.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests as usize,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request and check the window. Returns `Ok(())` when the
    /// request is admitted, or the backoff hint in milliseconds when the
    /// window is full.
    pub fn check(&self, session_id: &SessionId, channel: ChannelKind) -> Result<(), u64> {
        self.check_at(session_id, channel, Instant::now())
    }

    fn check_at(
        &self,
        session_id: &SessionId,
        channel: ChannelKind,
        now: Instant,
    ) -> Result<(), u64> {
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry((session_id.clone(), channel))
            .or_insert_with(VecDeque::new);

        // Slide the window.
        while let Some(front) = bucket.front() {
            if now.duration_since(*front) >= self.window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() >= self.max_requests {
            let oldest = bucket.front().copied().unwrap_or(now);
            let retry_after = self
                .window
                .saturating_sub(now.duration_since(oldest))
                .as_millis() as u64;
            return Err(retry_after.max(1));
        }

        bucket.push_back(now);
        Ok(())
    }

    /// Drop state for sessions that are gone.
    pub fn forget(&self, session_id: &SessionId) {
        let mut buckets = self.buckets.lock();
        buckets.retain(|(sid, _), _| sid != session_id);
    }
}
