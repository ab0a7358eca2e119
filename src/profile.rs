//! User profiles and their favorite poems

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::auth::Auth;
use crate::error::Error;
use crate::poetry::PoemId;
use crate::postgrest::PostgrestClient;

/// A user's saved poem ids. Never holds the same id twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<PoemId>>", into = "Vec<PoemId>")]
pub struct FavoriteSet(Vec<PoemId>);

impl FavoriteSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is saved
    pub fn contains(&self, id: PoemId) -> bool {
        self.0.contains(&id)
    }

    /// The set with `id` removed if present, appended otherwise
    pub fn toggled(&self, id: PoemId) -> Self {
        if self.contains(id) {
            self.without(id)
        } else {
            let mut ids = self.0.clone();
            ids.push(id);
            Self(ids)
        }
    }

    /// The set with `id` removed
    pub fn without(&self, id: PoemId) -> Self {
        Self(self.0.iter().copied().filter(|fav| *fav != id).collect())
    }

    /// Saved ids in stored order
    pub fn ids(&self) -> &[PoemId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<PoemId>> for FavoriteSet {
    fn from(ids: Vec<PoemId>) -> Self {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self(unique)
    }
}

impl From<Option<Vec<PoemId>>> for FavoriteSet {
    fn from(ids: Option<Vec<PoemId>>) -> Self {
        ids.map(Self::from).unwrap_or_default()
    }
}

impl From<FavoriteSet> for Vec<PoemId> {
    fn from(set: FavoriteSet) -> Self {
        set.0
    }
}

/// Application-level user record keyed by subject id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub avatar: Option<String>,

    #[serde(default)]
    pub favorites: FavoriteSet,
}

impl Profile {
    /// A profile with no display data and no favorites
    pub fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            username: None,
            avatar: None,
            favorites: FavoriteSet::new(),
        }
    }
}

/// json-server hands out numeric ids, the provider uses uuids.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[derive(Serialize)]
pub(crate) struct FavoritesPatch<'a> {
    pub(crate) favorites: &'a FavoriteSet,
}

/// Where profiles live
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the profile of `id`; [`Error::NotFound`] when there is none
    async fn read_profile(&self, id: &str) -> Result<Profile, Error>;

    /// Replace the favorites field of `id`, leaving every other field alone
    async fn update_favorites(&self, id: &str, favorites: &FavoriteSet) -> Result<(), Error>;
}

/// Profiles in the provider's `users` table
pub struct PostgrestProfileStore {
    table: PostgrestClient,
    auth: Option<Arc<Auth>>,
}

impl PostgrestProfileStore {
    /// Store over `table`, authenticating with the session held by `auth`
    pub fn new(table: PostgrestClient, auth: Option<Arc<Auth>>) -> Self {
        Self { table, auth }
    }

    fn client(&self) -> PostgrestClient {
        let token = self.auth.as_ref().and_then(|auth| auth.access_token());
        self.table.clone().with_auth(token)
    }
}

#[async_trait]
impl ProfileStore for PostgrestProfileStore {
    async fn read_profile(&self, id: &str) -> Result<Profile, Error> {
        debug!("Reading profile {}", id);
        self.client()
            .select("*")
            .eq("id", id)
            .execute_one::<Profile>()
            .await?
            .ok_or(Error::NotFound)
    }

    async fn update_favorites(&self, id: &str, favorites: &FavoriteSet) -> Result<(), Error> {
        debug!("Saving {} favorites for {}", favorites.len(), id);
        let updated = self
            .client()
            .update(FavoritesPatch { favorites })
            .eq("id", id)
            .execute::<serde_json::Value>()
            .await?;

        // Row level security hides rows instead of rejecting the write.
        if updated.is_empty() {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}
