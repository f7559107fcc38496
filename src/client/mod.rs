use std::sync::Arc;

use reqwest::cookie::Jar;

use crate::config::Config;
use crate::errors::Error;
use crate::request_context::RequestDispatchContext;
use crate::session::{LoginRedirect, SessionExpiredHandler};
use crate::token::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

mod auth;
mod impls;
mod options;

pub use options::{Credentials, MultipartPayload, RequestBody, RequestOptions};

/// Authenticated HTTP client shared by every screen of the application.
///
/// Cloning is cheap; clones share the credential store and the refresh
/// coordinator, so a 401 seen through any clone joins the same refresh.
#[derive(Clone)]
pub struct ApiClient {
    ctx: RequestDispatchContext,
}

pub struct ApiClientBuilder {
    config: Config,
    store: Option<Arc<dyn CredentialStore>>,
    cookie_jar: Option<Arc<Jar>>,
    on_expired: Option<Arc<dyn SessionExpiredHandler>>,
}

impl ApiClientBuilder {
    pub fn store(mut self, store: impl CredentialStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn shared_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Jar used by credentialed requests; the refresh cookie lives here.
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn on_session_expired(mut self, handler: impl SessionExpiredHandler + 'static) -> Self {
        self.on_expired = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<ApiClient, Error> {
        let config = self.config.validated()?;
        let retry_plan = config.retry_plan()?;

        let store: Arc<dyn CredentialStore> = match (self.store, &config.credential_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileCredentialStore::open(path, &config.token_key)?),
            (None, None) => Arc::new(MemoryCredentialStore::new()),
        };
        let jar = self.cookie_jar.unwrap_or_default();
        let on_expired: Arc<dyn SessionExpiredHandler> = match self.on_expired {
            Some(handler) => handler,
            None => Arc::new(LoginRedirect),
        };

        let mut plain = reqwest::Client::builder();
        let mut credentialed = reqwest::Client::builder().cookie_provider(jar);
        if let Some(timeout) = config.request_timeout() {
            plain = plain.timeout(timeout);
            credentialed = credentialed.timeout(timeout);
        }

        let ctx = RequestDispatchContext::build(
            config,
            plain.build()?,
            credentialed.build()?,
            retry_plan,
            store,
            on_expired,
        );
        Ok(ApiClient { ctx })
    }
}

impl ApiClient {
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::builder(config).build()
    }

    pub fn builder(config: Config) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            store: None,
            cookie_jar: None,
            on_expired: None,
        }
    }

    pub fn config(&self) -> &Config {
        self.ctx.config()
    }

    pub fn store(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(self.ctx.store())
    }

    pub(crate) fn context(&self) -> &RequestDispatchContext {
        &self.ctx
    }

    /// Whether a refresh window is currently open.
    pub async fn is_refreshing(&self) -> bool {
        self.ctx.refresh().is_refreshing().await
    }
}
