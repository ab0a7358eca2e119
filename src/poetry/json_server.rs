//! The mock REST data server (json-server dialect)

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use super::{Poem, PoemId, PoemSummary, PoetryQuery, PoetryStore};
use crate::error::Error;
use crate::fetch::Fetch;
use crate::profile::{FavoritesPatch, FavoriteSet, Profile, ProfileStore};

/// Client for the `/poetry` and `/users` resources of the data server
#[derive(Debug, Clone)]
pub struct JsonServerPoetry {
    url: String,
    client: Client,
    timeout: Option<Duration>,
}

impl JsonServerPoetry {
    /// Create a client for the data server at `url`
    pub fn new(url: &str, client: Client, timeout: Option<Duration>) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            timeout,
        }
    }

    fn resource(&self, path: &str) -> String {
        format!("{}/{}", self.url, path)
    }
}

#[async_trait]
impl PoetryStore for JsonServerPoetry {
    async fn list(&self, query: &PoetryQuery) -> Result<Vec<PoemSummary>, Error> {
        debug!("Listing poetry page {}", query.page);
        Fetch::get(&self.client, &self.resource("poetry"))
            .query(query.to_params())
            .timeout(self.timeout)
            .execute::<Vec<PoemSummary>>()
            .await
    }

    async fn get_by_id(&self, id: PoemId) -> Result<Option<Poem>, Error> {
        Fetch::get(&self.client, &self.resource(&format!("poetry/{}", id)))
            .timeout(self.timeout)
            .execute_optional::<Poem>()
            .await
    }

    async fn get_by_ids(&self, ids: &[PoemId]) -> Result<Vec<PoemSummary>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Fetch::get(&self.client, &self.resource("poetry"))
            .query(ids.iter().map(|id| ("id", id.to_string())))
            .timeout(self.timeout)
            .execute::<Vec<PoemSummary>>()
            .await
    }
}

/// Legacy profile storage on the data server's `/users/{id}` resource
#[async_trait]
impl ProfileStore for JsonServerPoetry {
    async fn read_profile(&self, id: &str) -> Result<Profile, Error> {
        Fetch::get(&self.client, &self.resource(&format!("users/{}", id)))
            .timeout(self.timeout)
            .execute_optional::<Profile>()
            .await?
            .ok_or(Error::NotFound)
    }

    async fn update_favorites(&self, id: &str, favorites: &FavoriteSet) -> Result<(), Error> {
        Fetch::patch(&self.client, &self.resource(&format!("users/{}", id)))
            .timeout(self.timeout)
            .json(&FavoritesPatch { favorites })?
            .execute_empty()
            .await
    }
}
