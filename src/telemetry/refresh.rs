use std::time::{Duration, Instant};

use tracing::{Level, event};
use uuid::Uuid;

use crate::token::RefreshFailure;

/// Structured events for one refresh window.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    context: String,
    started: Instant,
}

impl RefreshTelemetry {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            context: context.into(),
            started: Instant::now(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn emit_start(&self) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            "refresh.start"
        );
    }

    pub fn emit_attach(&self, waiters: usize) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            waiters,
            "refresh.attach"
        );
    }

    pub fn emit_success(&self, token_len: usize) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            elapsed_ms = self.elapsed().as_millis() as u64,
            token_len,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, failure: &RefreshFailure) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            context = %self.context,
            elapsed_ms = self.elapsed().as_millis() as u64,
            error = %failure,
            "refresh.failure"
        );
    }

    pub fn emit_settled(&self, waiters: usize, renewed: bool) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            waiters,
            renewed,
            "refresh.settled"
        );
    }
}
