//! Authentication against the GoTrue-compatible auth provider

mod session;
mod types;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};

pub use session::*;
pub use types::*;

const CLIENT_INFO: &str = concat!("shici-client/", env!("CARGO_PKG_VERSION"));

/// The auth provider as seen by the rest of the application
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error>;

    /// Register a new account. Returns `None` when the provider requires
    /// email confirmation before issuing a session.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, Error>;

    /// Sign out the current session
    async fn sign_out(&self) -> Result<(), Error>;

    /// The current session, if any
    async fn current_session(&self) -> Result<Option<Session>, Error>;

    /// Subscribe to session changes
    fn subscribe(&self) -> SessionSubscription;
}

/// Client for the auth provider
pub struct Auth {
    /// The base URL of the provider
    url: String,

    /// The anonymous API key
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// Request timeout
    timeout: Option<Duration>,

    /// The current session
    session: Arc<RwLock<Option<Session>>>,

    /// Session change notifications
    changes: broadcast::Sender<AuthStateChange>,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, client: Client, timeout: Option<Duration>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            timeout,
            session: Arc::new(RwLock::new(None)),
            changes,
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn request<'a>(&self, builder: FetchBuilder<'a>) -> FetchBuilder<'a> {
        builder
            .header("apikey", &self.key)
            .header("X-Client-Info", CLIENT_INFO)
            .timeout(self.timeout)
    }

    /// Get the current session without contacting the provider
    pub fn get_session(&self) -> Option<Session> {
        let current = self.session.read().unwrap_or_else(PoisonError::into_inner);
        current.clone()
    }

    /// Access token of the current session
    pub fn access_token(&self) -> Option<String> {
        self.get_session().map(|s| s.access_token)
    }

    /// Install a session obtained elsewhere and notify subscribers
    pub fn set_session(&self, session: Session) {
        self.store(Some(session.with_expiry()), AuthChangeEvent::SessionRestored);
    }

    fn store(&self, session: Option<Session>, event: AuthChangeEvent) {
        {
            let mut current = self.session.write().unwrap_or_else(PoisonError::into_inner);
            *current = session.clone();
        }
        debug!("Auth state change: {:?}", event);
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(AuthStateChange { event, session });
    }
}

/// Pull a human readable message out of a provider error body
pub(crate) fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

fn into_auth_error(err: Error) -> Error {
    match err {
        Error::Status { body, .. } => Error::Auth(provider_message(&body)),
        other => other,
    }
}

#[async_trait]
impl AuthProvider for Auth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let url = self.get_auth_url("/token");

        let session = self
            .request(Fetch::post(&self.client, &url))
            .query([("grant_type", "password")])
            .json(&Credentials { email, password })?
            .execute::<Session>()
            .await
            .map_err(into_auth_error)?
            .with_expiry();

        info!("Signed in as {}", session.user.id);
        self.store(Some(session.clone()), AuthChangeEvent::SignedIn);
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, Error> {
        let url = self.get_auth_url("/signup");

        let body = self
            .request(Fetch::post(&self.client, &url))
            .json(&Credentials { email, password })?
            .execute::<serde_json::Value>()
            .await
            .map_err(into_auth_error)?;

        if body.get("access_token").is_none() {
            info!("Signed up {}, email confirmation pending", email);
            return Ok(None);
        }

        let session = serde_json::from_value::<Session>(body)?.with_expiry();
        info!("Signed up and signed in as {}", session.user.id);
        self.store(Some(session.clone()), AuthChangeEvent::SignedIn);
        Ok(Some(session))
    }

    async fn sign_out(&self) -> Result<(), Error> {
        let token = match self.access_token() {
            Some(token) => token,
            None => {
                self.store(None, AuthChangeEvent::SignedOut);
                return Ok(());
            }
        };

        let url = self.get_auth_url("/logout");
        self.request(Fetch::post(&self.client, &url))
            .bearer_auth(&token)
            .execute_empty()
            .await
            .map_err(into_auth_error)?;

        info!("Signed out");
        self.store(None, AuthChangeEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, Error> {
        match self.get_session() {
            Some(session) if session.is_expired() => {
                info!("Session for {} expired", session.user.id);
                self.store(None, AuthChangeEvent::SignedOut);
                Ok(None)
            }
            session => Ok(session),
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.changes.subscribe())
    }
}
