//! Bounded retry for transient storage contention.
//!
//! Only `Internal` errors whose message marks SQLite lock contention are
//! retried. Business rejections always return on the first attempt.

use crate::error::ServiceError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(400),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt as u32);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub fn is_transient(err: &ServiceError) -> bool {
    match err {
        ServiceError::Internal(db_err) => {
            let msg = db_err.to_string().to_lowercase();
            msg.contains("database is locked") || msg.contains("database is busy") || msg.contains("sqlite_busy")
        }
        _ => false,
    }
}

/// Runs `operation`, retrying transient failures under the default policy.
pub async fn with_retry<F, Fut, T>(label: &'static str, operation: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    with_policy(RetryPolicy::default(), label, operation).await
}

pub async fn with_policy<F, Fut, T>(
    policy: RetryPolicy,
    label: &'static str,
    mut operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(op = label, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if is_transient(&err) && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    op = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient storage contention, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
