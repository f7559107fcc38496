use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::errors::Error;

/// Strategy for adding randomness to delay calculations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JitterStrategy {
    Full,
    Decorrelated,
}

/// Backoff schedule applied when a request never reached the backend.
#[derive(Clone, Debug)]
pub struct RetryPlan {
    /// Total sends, including the first one.
    pub max_attempts: u8,
    pub initial_delay: Duration,
    pub multiplier: f32,
    pub max_delay: Duration,
    pub jitter: JitterStrategy,
}

impl RetryPlan {
    pub fn new(
        max_attempts: u8,
        initial_delay: Duration,
        multiplier: f32,
        max_delay: Duration,
        jitter: JitterStrategy,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier,
            max_delay,
            jitter,
        }
    }

    pub fn default_plan() -> Self {
        Self::new(
            3,
            Duration::from_millis(200),
            1.8,
            Duration::from_secs(5),
            JitterStrategy::Full,
        )
    }

    /// A plan that sends exactly once.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO, 1.0, Duration::ZERO, JitterStrategy::Full)
    }

    /// Delay to wait before sending `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u8, rng: &mut impl Rng) -> Duration {
        if attempt <= 1 {
            return self.initial_delay;
        }
        let exp = self.multiplier.powi(i32::from(attempt) - 1) as f64;
        let capped = self.initial_delay.mul_f64(exp).min(self.max_delay);
        let factor = match self.jitter {
            JitterStrategy::Full => rng.gen_range(0.0..1.0),
            JitterStrategy::Decorrelated => rng.gen_range(0.5..1.5),
        };
        capped.mul_f64(factor).min(self.max_delay)
    }
}

impl Default for RetryPlan {
    fn default() -> Self {
        Self::default_plan()
    }
}

impl FromStr for JitterStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(JitterStrategy::Full),
            "decorrelated" => Ok(JitterStrategy::Decorrelated),
            other => Err(Error::Config(format!(
                "Unknown jitter strategy '{}'; expected 'full' or 'decorrelated'",
                other
            ))),
        }
    }
}
