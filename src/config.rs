//! read client configuration from a file, the environment, or explicit values

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Error;
use crate::retry::{JitterStrategy, RetryPlan};

const DEFAULT_USER_AGENT: &str = "session-client-rust/0.1.0";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_register_path")]
    pub register_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Where the session-expired hook sends the user.
    #[serde(default = "default_login_redirect")]
    pub login_redirect: String,
    /// Storage key the access token lives under.
    #[serde(default = "default_token_key")]
    pub token_key: String,
    #[serde(default)]
    pub credential_path: Option<String>,
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u8,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_retry_jitter")]
    pub retry_jitter: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_refresh_path() -> String {
    "/auth/refresh".into()
}
fn default_login_path() -> String {
    "/auth/login".into()
}
fn default_register_path() -> String {
    "/auth/register".into()
}
fn default_logout_path() -> String {
    "/auth/logout".into()
}
fn default_login_redirect() -> String {
    "/login".into()
}
fn default_token_key() -> String {
    "access_token".into()
}
fn default_refresh_timeout_ms() -> u64 {
    10_000
}
fn default_retry_max_attempts() -> u8 {
    3
}
fn default_retry_initial_delay_ms() -> u64 {
    200
}
fn default_retry_max_delay_ms() -> u64 {
    5_000
}
fn default_retry_jitter() -> String {
    "full".into()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

impl Config {
    /// Build a config for `base_url` with every other field at its default.
    pub fn from_values(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: default_refresh_path(),
            login_path: default_login_path(),
            register_path: default_register_path(),
            logout_path: default_logout_path(),
            login_redirect: default_login_redirect(),
            token_key: default_token_key(),
            credential_path: None,
            refresh_timeout_ms: default_refresh_timeout_ms(),
            request_timeout_ms: None,
            retry_max_attempts: default_retry_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_jitter: default_retry_jitter(),
            user_agent: default_user_agent(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validated()
    }

    /// # ENV Vars
    /// * `SESSION_CLIENT_BASE_URL` - backend base URL (required)
    /// * `SESSION_CLIENT_REFRESH_TIMEOUT_MS` - upper bound on one refresh call
    /// * `SESSION_CLIENT_CREDENTIAL_PATH` - JSON file persisting the access token
    /// * `SESSION_CLIENT_TOKEN_KEY` - storage key for the access token
    /// * `SESSION_CLIENT_RETRY_MAX_ATTEMPTS` - transport retry budget for idempotent calls
    /// * `SESSION_CLIENT_RETRY_JITTER` - `full` or `decorrelated`
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("SESSION_CLIENT_BASE_URL")
            .map_err(|_| Error::Config("Missing SESSION_CLIENT_BASE_URL env var".to_string()))?;
        let mut config = Self::from_values(base_url);
        if let Some(ms) = env_parsed::<u64>("SESSION_CLIENT_REFRESH_TIMEOUT_MS")? {
            config.refresh_timeout_ms = ms;
        }
        if let Ok(path) = std::env::var("SESSION_CLIENT_CREDENTIAL_PATH") {
            config.credential_path = Some(path);
        }
        if let Ok(key) = std::env::var("SESSION_CLIENT_TOKEN_KEY") {
            config.token_key = key;
        }
        if let Some(attempts) = env_parsed::<u8>("SESSION_CLIENT_RETRY_MAX_ATTEMPTS")? {
            config.retry_max_attempts = attempts;
        }
        if let Ok(jitter) = std::env::var("SESSION_CLIENT_RETRY_JITTER") {
            config.retry_jitter = jitter;
        }
        config.validated()
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_credential_path(mut self, path: impl Into<String>) -> Self {
        self.credential_path = Some(path.into());
        self
    }

    pub fn with_retry(mut self, max_attempts: u8, initial_delay: Duration, max_delay: Duration) -> Self {
        self.retry_max_attempts = max_attempts;
        self.retry_initial_delay_ms = initial_delay.as_millis() as u64;
        self.retry_max_delay_ms = max_delay.as_millis() as u64;
        self
    }

    /// Normalizes the base URL and rejects values that cannot work.
    pub fn validated(mut self) -> Result<Self, Error> {
        let base = if self.base_url.contains("://") {
            self.base_url.clone()
        } else {
            format!("https://{}", self.base_url)
        };
        let base = base.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base, e)))?;
        self.base_url = base;
        if self.token_key.is_empty() {
            return Err(Error::Config("token_key must not be empty".into()));
        }
        if self.refresh_timeout_ms == 0 {
            return Err(Error::Config("refresh_timeout_ms must be > 0".into()));
        }
        if self.retry_max_attempts == 0 {
            return Err(Error::Config("retry_max_attempts must be >= 1".into()));
        }
        self.retry_jitter.parse::<JitterStrategy>()?;
        Ok(self)
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.contains("://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn login_redirect_url(&self) -> String {
        self.url_for(&self.login_redirect)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn retry_plan(&self) -> Result<RetryPlan, Error> {
        Ok(RetryPlan::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_initial_delay_ms),
            1.8,
            Duration::from_millis(self.retry_max_delay_ms),
            self.retry_jitter.parse()?,
        ))
    }

    /// Whether `path` is one of the cookie-credentialed auth endpoints that
    /// never carry a bearer token.
    ///
    /// Accepts the same spellings as [`Config::url_for`]: with or without the
    /// leading `/`, or as an absolute URL under the base URL.
    pub fn is_auth_path(&self, path: &str) -> bool {
        let path = self.route_of(path);
        [
            &self.refresh_path,
            &self.login_path,
            &self.register_path,
            &self.logout_path,
        ]
        .iter()
        .any(|p| self.route_of(p.as_str()) == path)
    }

    fn route_of<'a>(&self, path: &'a str) -> &'a str {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = path.strip_prefix(self.base_url.as_str()).unwrap_or(path);
        path.trim_start_matches('/').trim_end_matches('/')
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>, Error> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid value for {name}: '{raw}'"))),
        Err(_) => Ok(None),
    }
}
