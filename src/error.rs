//! Error handling for the poetry site client

use std::fmt;
use thiserror::Error;

/// Unified error type for the poetry site client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Authentication errors, carrying the provider's message verbatim
    #[error("{0}")]
    Auth(String),

    /// Profile or poetry table errors
    #[error("Database error: {0}")]
    Database(String),

    /// A remote service answered with a non-success status
    #[error("Request failed with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body as text
        body: String,
    },

    /// The requested record does not exist
    #[error("Record not found")]
    NotFound,

    /// The operation needs a signed-in user
    #[error("Not signed in")]
    NotSignedIn,

    /// The view has no profile loaded for the signed-in user yet
    #[error("User data not loaded")]
    NotLoaded,

    /// The signed-in user changed after the view loaded its data
    #[error("Signed-in user changed")]
    SessionChanged,

    /// Persisting the favorites list failed; local state was left untouched
    #[error("Failed to save favorites: {0}")]
    FavoritesPersist(String),

    /// A comment was submitted without content
    #[error("Comment content must not be empty")]
    EmptyComment,

    /// The dynasty filter comes from the route and cannot be changed
    #[error("Dynasty filter is fixed by the current route")]
    DynastyLocked,

    /// A form field was rejected before anything was sent
    #[error("{0}")]
    Invalid(&'static str),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new database error
    pub fn database<T: fmt::Display>(msg: T) -> Self {
        Error::Database(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// Whether retrying the same action may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Status { .. } | Error::FavoritesPersist(_)
        )
    }
}
