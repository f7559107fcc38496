use rand::{SeedableRng, rngs::StdRng};
use reqwest::Method;
use std::fmt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::normalize::{ApiError, ErrorKind};

use super::{RetryOutcome, plan::RetryPlan};

/// A single logical request as seen by the retry layer.
#[derive(Debug, Clone)]
pub struct Operation {
    pub method: Method,
    pub path: String,
    /// Whether sending the request twice is harmless.
    pub idempotent: bool,
}

impl Operation {
    /// `has_idempotency_key` lets non-idempotent methods opt into retries.
    pub fn new(method: Method, path: impl Into<String>, has_idempotency_key: bool) -> Self {
        let idempotent = has_idempotency_key
            || matches!(
                method,
                Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
            );
        Self {
            method,
            path: path.into(),
            idempotent,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

pub struct RetryCoordinator {
    plan: RetryPlan,
    rng: Mutex<StdRng>,
}

impl RetryCoordinator {
    pub fn new(plan: RetryPlan) -> Self {
        Self {
            plan,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn plan(&self) -> RetryPlan {
        self.plan.clone()
    }

    /// Runs `op` until it succeeds, fails with something other than a
    /// transport error, or the plan's attempt budget is spent. Operations that
    /// are not idempotent are sent once.
    pub async fn execute<F, Fut, T>(
        &self,
        operation: &Operation,
        mut op: F,
    ) -> Result<(T, RetryOutcome), ApiError>
    where
        F: FnMut(u8) -> Fut,
        Fut: std::future::Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = if operation.idempotent {
            self.plan.max_attempts
        } else {
            1
        };
        let mut attempt: u8 = 1;
        let start = Instant::now();
        loop {
            match op(attempt).await {
                Ok(value) => {
                    let outcome = RetryOutcome {
                        operation: operation.to_string(),
                        attempts: attempt,
                        success: true,
                        total_delay: start.elapsed(),
                    };
                    outcome.log();
                    return Ok((value, outcome));
                }
                Err(err) => {
                    if attempt >= max_attempts || !Self::is_retriable(&err) {
                        let outcome = RetryOutcome {
                            operation: operation.to_string(),
                            attempts: attempt,
                            success: false,
                            total_delay: start.elapsed(),
                        };
                        outcome.log();
                        return Err(err);
                    }
                    let delay = {
                        let mut rng = self.rng.lock().await;
                        self.plan.delay_for_attempt(attempt + 1, &mut *rng)
                    };
                    warn!(
                        operation = %operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retry.scheduling"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn is_retriable(err: &ApiError) -> bool {
        err.kind() == ErrorKind::Transport
    }
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self::new(RetryPlan::default_plan())
    }
}
