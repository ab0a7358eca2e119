//! Types for authentication state notifications

use log::warn;
use serde::Serialize;
use tokio::sync::broadcast;

use super::Session;

/// Kind of session change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    /// A session was created by sign-in or sign-up
    SignedIn,
    /// The session was destroyed by sign-out or expiry
    SignedOut,
    /// A session was installed from outside (restored or refreshed)
    SessionRestored,
}

/// A session change notification
#[derive(Debug, Clone)]
pub struct AuthStateChange {
    /// What happened
    pub event: AuthChangeEvent,
    /// The session after the change
    pub session: Option<Session>,
}

/// Email/password credentials
#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Receiving end of the session change notifications.
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// stops delivery.
pub struct SessionSubscription {
    rx: broadcast::Receiver<AuthStateChange>,
}

impl SessionSubscription {
    pub(crate) fn new(rx: broadcast::Receiver<AuthStateChange>) -> Self {
        Self { rx }
    }

    /// Wait for the next change. Returns `None` once the provider is gone.
    ///
    /// A lagging subscriber skips the changes it missed and continues with
    /// the oldest one still buffered.
    pub async fn next(&mut self) -> Option<AuthStateChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Session subscriber lagged, skipped {} changes", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving notifications
    pub fn unsubscribe(self) {}
}
