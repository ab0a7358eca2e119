//! Table access through the PostgREST API

mod filter;
mod query;
mod types;

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub use filter::*;
pub use query::*;
pub use types::*;

use query::Target;

/// Client for one table or view
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    target: Target,
}

impl PostgrestClient {
    /// Create a new PostgrestClient
    pub fn new(url: &str, key: &str, table: &str, client: Client, timeout: Option<Duration>) -> Self {
        Self {
            target: Target {
                url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
                key: key.to_string(),
                client,
                timeout,
                token: None,
            },
        }
    }

    /// Send requests with the user's access token instead of the anon key
    pub fn with_auth(mut self, token: Option<String>) -> Self {
        self.target.token = token;
        self
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.target.clone(), columns)
    }

    /// Update data in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.target.clone(), values)
    }
}
