//! Single-flight renewal of the access token.
//!
//! The first caller that sees a 401 opens a refresh window: it spawns one task
//! that owns the refresh call and publishes the outcome on a `watch` channel.
//! Every caller that sees a 401 while the window is open subscribes to that
//! channel instead of calling the refresh endpoint itself. The window closes
//! when the outcome is published, so the next 401 opens a new one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::USER_AGENT;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::config::Config;
use crate::normalize::ApiError;
use crate::session::SessionExpiredHandler;
use crate::telemetry::refresh::RefreshTelemetry;
use crate::types::RefreshResponse;

use super::CredentialStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    Transport(String),
    Status(StatusCode),
    Timeout(Duration),
    MissingToken,
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshFailure::Transport(msg) => write!(f, "refresh call failed: {msg}"),
            RefreshFailure::Status(status) => write!(f, "refresh rejected with status {status}"),
            RefreshFailure::Timeout(after) => {
                write!(f, "refresh timed out after {} ms", after.as_millis())
            }
            RefreshFailure::MissingToken => write!(f, "refresh response carried no access token"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Renewed(String),
    Failed(RefreshFailure),
}

type OutcomeReceiver = watch::Receiver<Option<RefreshOutcome>>;

enum RefreshState {
    Idle,
    Refreshing {
        telemetry: RefreshTelemetry,
        waiters: usize,
        outcome: OutcomeReceiver,
    },
}

struct RefreshShared {
    http: reqwest::Client,
    url: String,
    user_agent: String,
    timeout: Duration,
    login_url: String,
    store: Arc<dyn CredentialStore>,
    on_expired: Arc<dyn SessionExpiredHandler>,
}

pub struct RefreshCoordinator {
    state: Arc<Mutex<RefreshState>>,
    shared: Arc<RefreshShared>,
}

impl RefreshCoordinator {
    /// `http` must carry the cookie jar; the refresh call authenticates with
    /// cookies, never with the (expired) bearer token.
    pub(crate) fn new(
        http: reqwest::Client,
        config: &Config,
        store: Arc<dyn CredentialStore>,
        on_expired: Arc<dyn SessionExpiredHandler>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RefreshState::Idle)),
            shared: Arc::new(RefreshShared {
                http,
                url: config.url_for(&config.refresh_path),
                user_agent: config.user_agent.clone(),
                timeout: config.refresh_timeout(),
                login_url: config.login_redirect_url(),
                store,
                on_expired,
            }),
        }
    }

    pub async fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock().await, RefreshState::Refreshing { .. })
    }

    /// Returns a token to replay a request that got a 401 while sending
    /// `stale`.
    ///
    /// Joins the open refresh window if there is one. Otherwise, when the
    /// store already holds a different token (someone refreshed in the
    /// meantime), that token is returned without a network call. Failing
    /// that, a new window is opened.
    pub async fn renew(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let mut outcome = {
            let mut state = self.state.lock().await;
            let joined = match &mut *state {
                RefreshState::Refreshing {
                    telemetry,
                    waiters,
                    outcome,
                } if outcome.has_changed().is_ok() => {
                    *waiters += 1;
                    telemetry.emit_attach(*waiters);
                    Some(outcome.clone())
                }
                _ => None,
            };
            match joined {
                Some(outcome) => outcome,
                None => {
                    if let Some(current) = self.shared.store.get()
                        && stale != Some(current.as_str())
                    {
                        debug!("refresh.skip_stale");
                        return Ok(current);
                    }
                    self.open_window(&mut state)
                }
            }
        };

        let settled = outcome.wait_for(Option::is_some).await.map(|v| (*v).clone());
        match settled {
            Ok(Some(RefreshOutcome::Renewed(token))) => Ok(token),
            Ok(Some(RefreshOutcome::Failed(failure))) => {
                Err(ApiError::session_expired(failure.to_string()))
            }
            Ok(None) | Err(_) => Err(ApiError::session_expired(
                "refresh ended without publishing an outcome",
            )),
        }
    }

    fn open_window(&self, state: &mut RefreshState) -> OutcomeReceiver {
        let (tx, rx) = watch::channel(None);
        let telemetry = RefreshTelemetry::new("unauthorized");
        telemetry.emit_start();
        *state = RefreshState::Refreshing {
            telemetry: telemetry.clone(),
            waiters: 1,
            outcome: rx.clone(),
        };
        tokio::spawn(run_refresh(
            Arc::clone(&self.shared),
            Arc::clone(&self.state),
            tx,
            telemetry,
        ));
        rx
    }
}

async fn run_refresh(
    shared: Arc<RefreshShared>,
    state: Arc<Mutex<RefreshState>>,
    tx: watch::Sender<Option<RefreshOutcome>>,
    telemetry: RefreshTelemetry,
) {
    let result = match tokio::time::timeout(shared.timeout, shared.call_endpoint()).await {
        Ok(result) => result,
        Err(_) => Err(RefreshFailure::Timeout(shared.timeout)),
    };

    let outcome = match result {
        Ok(token) => {
            if let Err(err) = shared.store.set(&token) {
                warn!(error = %err, "refresh.store_write_failed");
            }
            telemetry.emit_success(token.len());
            RefreshOutcome::Renewed(token)
        }
        Err(failure) => {
            if let Err(err) = shared.store.clear() {
                warn!(error = %err, "refresh.store_clear_failed");
            }
            telemetry.emit_failure(&failure);
            RefreshOutcome::Failed(failure)
        }
    };
    let renewed = matches!(outcome, RefreshOutcome::Renewed(_));

    // reset and publish under the lock so no caller can join a settled window
    let waiters = {
        let mut guard = state.lock().await;
        let waiters = match &*guard {
            RefreshState::Refreshing { waiters, .. } => *waiters,
            RefreshState::Idle => 0,
        };
        *guard = RefreshState::Idle;
        tx.send_replace(Some(outcome));
        waiters
    };
    telemetry.emit_settled(waiters, renewed);

    if !renewed {
        shared.on_expired.session_expired(&shared.login_url);
    }
}

impl RefreshShared {
    async fn call_endpoint(&self) -> Result<String, RefreshFailure> {
        let resp = self
            .http
            .post(&self.url)
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await
            .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RefreshFailure::Status(status));
        }
        let parsed: RefreshResponse =
            serde_json::from_str(&body).map_err(|_| RefreshFailure::MissingToken)?;
        parsed.into_token().ok_or(RefreshFailure::MissingToken)
    }
}
