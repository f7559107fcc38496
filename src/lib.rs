//! Authenticated HTTP client with single-flight access-token refresh.
//!
//! Every request goes through [`ApiClient::request`]. The bearer token comes
//! from a [`CredentialStore`]; when the backend answers 401, all callers that
//! hit it during the same window share one call to the refresh endpoint and
//! are replayed once with the new token. Failures reach callers as a single
//! [`ApiError`] shape.

mod client;
pub mod config;
pub mod errors;
pub mod normalize;
mod request_context;
pub mod retry;
pub mod session;
pub mod telemetry;
pub mod token;
pub mod types;

pub use client::{
    ApiClient, ApiClientBuilder, Credentials, MultipartPayload, RequestBody, RequestOptions,
};
pub use config::Config;
pub use errors::Error;
pub use normalize::{ApiError, ErrorKind};
pub use session::{LoginRedirect, SessionExpiredHandler};
pub use token::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use types::AuthSession;

#[cfg(test)]
mod tests;
