use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::ApiClient;
use crate::normalize::{self, ApiError};
use crate::retry::Operation;

use super::options::{Credentials, RequestBody, RequestOptions};

impl ApiClient {
    /// Sends `options` and decodes the success body into `T`.
    ///
    /// An empty success body decodes as `{}`. A 401 on an authenticated
    /// request is never returned as-is: the request waits for the shared
    /// token refresh and is replayed once with the renewed token. Every other
    /// failure is reported as a normalized [`ApiError`].
    pub async fn request<T: DeserializeOwned>(&self, options: RequestOptions) -> Result<T, ApiError> {
        let bypass = options.skip_auth || self.ctx.config().is_auth_path(&options.path);
        let token = if bypass { None } else { self.ctx.store().get() };

        let resp = self.send(&options, token.as_deref()).await?;
        if bypass || resp.status() != StatusCode::UNAUTHORIZED {
            return self.finish(&options, resp).await;
        }
        drop(resp);

        warn!(
            method = %options.method,
            path = %options.path,
            status = 401,
            "request.unauthorized"
        );
        let renewed = self.ctx.refresh().renew(token.as_deref()).await?;

        let replay = self.send(&options, Some(&renewed)).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            error!(
                method = %options.method,
                path = %options.path,
                status = 401,
                "request.unauthorized_after_refresh"
            );
            return Err(ApiError::session_expired(
                "request was rejected again after the token was renewed",
            ));
        }
        self.finish(&options, replay).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(RequestOptions::get(path)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(RequestOptions::delete(path)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestOptions::post(path).json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestOptions::put(path).json(body)?).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestOptions::patch(path).json(body)?).await
    }

    async fn send(&self, options: &RequestOptions, token: Option<&str>) -> Result<Response, ApiError> {
        let operation = Operation::new(
            options.method.clone(),
            options.path.clone(),
            options.idempotency_key.is_some(),
        );
        let (resp, _) = self
            .ctx
            .retry()
            .execute(&operation, |attempt| self.send_once(options, token, attempt))
            .await?;
        Ok(resp)
    }

    async fn send_once(
        &self,
        options: &RequestOptions,
        token: Option<&str>,
        attempt: u8,
    ) -> Result<Response, ApiError> {
        let config = self.ctx.config();
        let client = match options.credentials {
            Credentials::Include => self.ctx.credentialed_client(),
            Credentials::Omit => self.ctx.http_client(),
        };
        let url = config.url_for(&options.path);

        let mut req = client
            .request(options.method.clone(), &url)
            .headers(options.headers.clone());
        if !options.headers.contains_key(USER_AGENT)
            && let Ok(agent) = HeaderValue::from_str(&config.user_agent)
        {
            req = req.header(USER_AGENT, agent);
        }
        if !options.query.is_empty() {
            req = req.query(&options.query);
        }
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(key) = &options.idempotency_key {
            req = req.header("Idempotency-Key", key.as_str());
        }
        req = match &options.body {
            RequestBody::Empty => req,
            // reqwest sets `Content-Type: application/json`
            RequestBody::Json(value) => req.json(value),
            // reqwest sets the multipart content type with its boundary
            RequestBody::Multipart(payload) => {
                req.multipart(payload.to_form().map_err(|e| ApiError::transport(&e))?)
            }
        };

        debug!(
            method = %options.method,
            path = %options.path,
            attempt,
            authenticated = token.is_some(),
            "request.send"
        );
        req.send().await.map_err(|e| {
            warn!(
                method = %options.method,
                path = %options.path,
                attempt,
                error = %e,
                "request.transport_failed"
            );
            ApiError::transport(&e)
        })
    }

    async fn finish<T: DeserializeOwned>(
        &self,
        options: &RequestOptions,
        resp: Response,
    ) -> Result<T, ApiError> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::transport(&e))?;

        if !status.is_success() {
            let err = normalize::normalize(status, &body);
            warn!(
                method = %options.method,
                path = %options.path,
                status = status.as_u16(),
                message = %err.message(),
                "request.failed"
            );
            return Err(err);
        }

        let text = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| {
            error!(
                method = %options.method,
                path = %options.path,
                status = status.as_u16(),
                error = %e,
                "request.decode_failed"
            );
            ApiError::decode(status, &body)
        })
    }
}
