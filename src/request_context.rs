use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::retry::{RetryCoordinator, RetryPlan};
use crate::session::SessionExpiredHandler;
use crate::token::{CredentialStore, RefreshCoordinator};

/// Shared context for outbound requests ensuring consistent retry/token handling.
#[derive(Clone)]
pub struct RequestDispatchContext {
    config: Arc<Config>,
    http_client: Client,
    credentialed_client: Client,
    store: Arc<dyn CredentialStore>,
    retry: Arc<RetryCoordinator>,
    refresh: Arc<RefreshCoordinator>,
}

impl RequestDispatchContext {
    /// `credentialed_client` carries the cookie jar and is used for the
    /// refresh call and for requests that opt into credentials.
    pub fn build(
        config: Config,
        http_client: Client,
        credentialed_client: Client,
        retry_plan: RetryPlan,
        store: Arc<dyn CredentialStore>,
        on_expired: Arc<dyn SessionExpiredHandler>,
    ) -> Self {
        let refresh = RefreshCoordinator::new(
            credentialed_client.clone(),
            &config,
            Arc::clone(&store),
            on_expired,
        );
        Self {
            config: Arc::new(config),
            http_client,
            credentialed_client,
            store,
            retry: Arc::new(RetryCoordinator::new(retry_plan)),
            refresh: Arc::new(refresh),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn credentialed_client(&self) -> &Client {
        &self.credentialed_client
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn retry(&self) -> Arc<RetryCoordinator> {
        Arc::clone(&self.retry)
    }

    pub fn refresh(&self) -> Arc<RefreshCoordinator> {
        Arc::clone(&self.refresh)
    }
}
