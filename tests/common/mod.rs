#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use session_client::{ApiClient, Config, CredentialStore, Error, MemoryCredentialStore};
use wiremock::{MockServer, Request};

pub fn base_config(server: &MockServer) -> Config {
    Config::from_values(server.uri())
        .with_refresh_timeout(Duration::from_secs(2))
        .with_retry(2, Duration::from_millis(5), Duration::from_millis(20))
}

pub fn client_with_token(server: &MockServer, token: &str) -> ApiClient {
    ApiClient::builder(base_config(server))
        .store(MemoryCredentialStore::with_token(token))
        .build()
        .expect("client builds")
}

pub fn bearer(req: &Request) -> Option<String> {
    req.headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

pub async fn requests_to(server: &MockServer, path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == path)
        .collect()
}

/// Memory store that counts writes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryCredentialStore,
    pub sets: AtomicUsize,
    pub clears: AtomicUsize,
}

impl CountingStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            inner: MemoryCredentialStore::with_token(token),
            ..Default::default()
        }
    }
}

impl CredentialStore for CountingStore {
    fn get(&self) -> Option<String> {
        self.inner.get()
    }

    fn set(&self, token: &str) -> Result<(), Error> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(token)
    }

    fn clear(&self) -> Result<(), Error> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

#[derive(Clone, Default)]
pub struct ExpiryProbe {
    calls: Arc<AtomicUsize>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl ExpiryProbe {
    pub fn handler(&self) -> impl Fn(&str) + Send + Sync + 'static {
        let calls = self.calls.clone();
        let urls = self.urls.clone();
        move |url: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            urls.lock().unwrap().push(url.to_string());
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}
