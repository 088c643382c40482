// src/exec/retry.rs

use std::time::Duration;

use crate::config::RetrySection;
use crate::types::RetryStrategy;

/// How many times a tool call is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub strategy: RetryStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetrySection::default())
    }
}

impl RetryPolicy {
    pub fn from_config(section: &RetrySection) -> Self {
        Self {
            max_attempts: section.max_attempts.max(1),
            base_delay: Duration::from_millis(section.base_delay_ms),
            strategy: section.strategy,
        }
    }

    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            strategy: RetryStrategy::Linear,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            strategy: RetryStrategy::Exponential,
        }
    }

    /// Delay to wait after the given failed attempt (1-based), or `None` if
    /// that was the last attempt.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let attempt = attempt.max(1);
        let multiplier = match self.strategy {
            RetryStrategy::Linear => attempt,
            RetryStrategy::Exponential => 1u32 << (attempt - 1).min(30),
        };
        Some(self.base_delay.saturating_mul(multiplier))
    }
}
