use tracing::warn;

/// Invoked once per failed refresh window, after every waiter has been
/// rejected. `login_url` is the configured login entry point.
pub trait SessionExpiredHandler: Send + Sync {
    fn session_expired(&self, login_url: &str);
}

/// Default handler: records the redirect the UI layer is expected to perform.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoginRedirect;

impl SessionExpiredHandler for LoginRedirect {
    fn session_expired(&self, login_url: &str) {
        warn!(login_url, "session.expired");
    }
}

impl<F> SessionExpiredHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn session_expired(&self, login_url: &str) {
        self(login_url)
    }
}
