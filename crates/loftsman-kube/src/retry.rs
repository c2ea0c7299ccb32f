//! Bounded exponential backoff for cluster API calls

use std::future::Future;
use std::time::Duration;

use crate::error::{KubeError, Result};

/// Retry schedule: `steps` attempts, the delay growing by `factor` after each
/// failure and stretched by up to `jitter` of itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub steps: u32,
    pub initial: Duration,
    pub factor: f64,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            steps: 4,
            initial: Duration::from_millis(10),
            factor: 5.0,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            steps: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero-based), without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        self.initial.mul_f64(self.factor.powi(attempt as i32))
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        base + base.mul_f64(rand::random::<f64>() * self.jitter)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. The last error is returned.
pub async fn retry_on<T, F, Fut>(
    policy: &RetryPolicy,
    retryable: impl Fn(&KubeError) -> bool,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let steps = policy.steps.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < steps && retryable(&err) => {
                let delay = policy.jittered(attempt);
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying cluster request"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
