//! Bounded backoff for transport failures on idempotent requests.

mod coordinator;
mod outcome;
mod plan;

pub use coordinator::{Operation, RetryCoordinator};
pub use outcome::RetryOutcome;
pub use plan::{JitterStrategy, RetryPlan};
