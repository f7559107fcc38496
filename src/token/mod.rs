mod refresh;
mod store;

pub use refresh::{RefreshCoordinator, RefreshFailure, RefreshOutcome};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoredCredential};
