use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied,
}

impl RateDecision {
    pub fn is_allowed(self) -> bool {
        self == RateDecision::Allowed
    }
}

/// Per-user sliding-window rate limiter.
///
/// Each user gets at most `capacity` admitted requests within any trailing
/// `window`. A capacity of zero disables limiting entirely. State lives in
/// memory only and is lost on restart.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            window,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.capacity == 0
    }

    /// Check and record a request for `user_id` at the current instant
    pub fn check(&self, user_id: &str) -> RateDecision {
        self.check_and_record(user_id, Instant::now())
    }

    /// Check whether `user_id` may make a request at `now`, recording it if so.
    ///
    /// Pruning, counting and recording happen under one lock, so two
    /// concurrent checks can never both take the last free slot. The lock is
    /// never held across an await point.
    pub fn check_and_record(&self, user_id: &str, now: Instant) -> RateDecision {
        if self.is_disabled() {
            return RateDecision::Allowed;
        }

        // The map holds plain timestamps, so a panic elsewhere cannot leave it inconsistent
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let timestamps = requests.entry(user_id.to_string()).or_default();

        let window = self.window;
        timestamps.retain(|t| now.saturating_duration_since(*t) < window);

        if timestamps.len() >= self.capacity {
            debug!(
                "Rate limit reached for {}: {}/{} in {:?}",
                user_id,
                timestamps.len(),
                self.capacity,
                window
            );
            return RateDecision::Denied;
        }

        // Keep ascending order even if the caller's clock went backwards
        let position = timestamps.partition_point(|t| *t <= now);
        timestamps.insert(position, now);

        RateDecision::Allowed
    }

    /// Number of requests currently recorded for `user_id` (as of its last check)
    pub fn recorded(&self, user_id: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .map_or(0, VecDeque::len)
    }
}
