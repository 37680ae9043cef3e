//! # Retry
//!
//! Module providing a `RetryPolicy` struct to configure notification retrying.
use std::time;

#[derive(Clone, Debug)]
/// A retry policy to determine how many times, and after how long, a failed notification is retried.
pub struct RetryPolicy {
    /// The backoff interval for the first retry. Every later retry waits one more multiple of it.
    pub initial_interval: time::Duration,
    /// Total number of attempts for a single identifier, the first one included.
    pub max_attempts: u32,
    /// The maximum possible backoff between retries.
    pub maximum_interval: Option<time::Duration>,
}

impl RetryPolicy {
    /// Initialize a `RetryPolicyBuilder`.
    pub fn build(initial_interval: time::Duration, max_attempts: u32) -> RetryPolicyBuilder {
        RetryPolicyBuilder::new(initial_interval, max_attempts)
    }

    /// Determine the interval to wait after a failed attempt, `attempt` being 0-based.
    /// Backoff is linear: `initial_interval * (attempt + 1)`, capped at `maximum_interval` if set.
    pub fn retry_interval(&self, attempt: u32) -> time::Duration {
        let candidate_interval = self.initial_interval * attempt.saturating_add(1);

        match self.maximum_interval {
            Some(max_interval) => std::cmp::min(candidate_interval, max_interval),
            None => candidate_interval,
        }
    }

    /// Whether another attempt may follow the failed 0-based `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicyBuilder::default().provide()
    }
}

/// Builder pattern struct to provide a `RetryPolicy`.
pub struct RetryPolicyBuilder {
    /// The backoff interval for the first retry.
    pub initial_interval: time::Duration,
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    /// The maximum possible backoff between retries.
    pub maximum_interval: Option<time::Duration>,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            initial_interval: time::Duration::from_secs(1),
            max_attempts: 3,
            maximum_interval: None,
        }
    }
}

impl RetryPolicyBuilder {
    pub fn new(initial_interval: time::Duration, max_attempts: u32) -> Self {
        Self {
            initial_interval,
            max_attempts,
            ..RetryPolicyBuilder::default()
        }
    }

    pub fn maximum_interval(mut self, interval: time::Duration) -> RetryPolicyBuilder {
        self.maximum_interval = Some(interval);
        self
    }

    /// Provide a `RetryPolicy` according to build parameters provided thus far.
    pub fn provide(&self) -> RetryPolicy {
        RetryPolicy {
            initial_interval: self.initial_interval,
            // A policy always allows the first attempt.
            max_attempts: self.max_attempts.max(1),
            maximum_interval: self.maximum_interval,
        }
    }
}
