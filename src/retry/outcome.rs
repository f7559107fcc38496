use std::time::Duration;

use tracing::Level;
use tracing::event;

#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub operation: String,
    pub attempts: u8,
    pub success: bool,
    pub total_delay: Duration,
}

impl RetryOutcome {
    pub fn retried(&self) -> bool {
        self.attempts > 1
    }

    pub fn log(&self) {
        if !self.retried() && self.success {
            event!(Level::DEBUG, operation = %self.operation, "retry.outcome");
            return;
        }
        event!(
            Level::INFO,
            operation = %self.operation,
            attempts = self.attempts,
            success = self.success,
            total_delay_ms = self.total_delay.as_millis() as u64,
            "retry.outcome"
        );
    }
}
