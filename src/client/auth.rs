use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::ApiClient;
use crate::normalize::ApiError;
use crate::types::AuthSession;

use super::options::{Credentials, RequestOptions};

impl ApiClient {
    /// Logs in with cookie credentials and stores the returned access token.
    pub async fn login<B: Serialize + ?Sized>(&self, credentials: &B) -> Result<AuthSession, ApiError> {
        let path = self.ctx.config().login_path.clone();
        self.authenticate(path, credentials).await
    }

    /// Registers an account; a token in the response is stored like a login.
    pub async fn register<B: Serialize + ?Sized>(&self, payload: &B) -> Result<AuthSession, ApiError> {
        let path = self.ctx.config().register_path.clone();
        self.authenticate(path, payload).await
    }

    /// Ends the session. The stored token is cleared even when the call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let options = RequestOptions::post(self.ctx.config().logout_path.clone())
            .credentials(Credentials::Include);
        let result = self.request::<Value>(options).await.map(|_| ());
        if let Err(err) = self.ctx.store().clear() {
            warn!(error = %err, "auth.logout.store_clear_failed");
        }
        info!(server_ack = result.is_ok(), "auth.logout");
        result
    }

    async fn authenticate<B: Serialize + ?Sized>(
        &self,
        path: String,
        body: &B,
    ) -> Result<AuthSession, ApiError> {
        let options = RequestOptions::post(path.as_str())
            .credentials(Credentials::Include)
            .json(body)?;
        let session: AuthSession = self.request(options).await?;
        match session.token() {
            Some(token) => {
                if let Err(err) = self.ctx.store().set(token) {
                    warn!(error = %err, "auth.store_write_failed");
                }
                info!(path = %path, token_len = token.len(), "auth.session_started");
            }
            None => info!(path = %path, "auth.no_token_in_response"),
        }
        Ok(session)
    }
}
