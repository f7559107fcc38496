use serde::Deserialize;
use serde_json::Value;

/// Body of a successful `POST /auth/refresh`.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RefreshResponse {
    pub access_token: Option<String>,
    #[serde(rename = "accessToken")]
    pub access_token_camel: Option<String>,
    pub token: Option<String>,
}

impl RefreshResponse {
    pub fn into_token(self) -> Option<String> {
        [self.access_token, self.access_token_camel, self.token]
            .into_iter()
            .flatten()
            .find(|t| !t.trim().is_empty())
    }
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthSession {
    pub access_token: Option<String>,
    #[serde(rename = "accessToken")]
    pub access_token_camel: Option<String>,
    pub token: Option<String>,
    pub user: Option<Value>,
}

impl AuthSession {
    pub fn token(&self) -> Option<&str> {
        [&self.access_token, &self.access_token_camel, &self.token]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .find(|t| !t.trim().is_empty())
    }
}
