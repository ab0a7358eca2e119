//! Adding and removing poems from the signed-in user's favorites.
//!
//! Writes go to the store first; local state changes only after the store
//! accepted the new list. The remote field is last-writer-wins, so callers
//! that suspect a concurrent edit should [`refresh`](Favorites::refresh)
//! before toggling again.

use log::{debug, error};
use std::sync::Arc;

use crate::binder::CurrentUser;
use crate::error::Error;
use crate::poetry::PoemId;
use crate::profile::{FavoriteSet, Profile, ProfileStore};

/// A user's favorites, backed by a profile store
pub struct Favorites {
    store: Arc<dyn ProfileStore>,
    profile: Profile,
}

impl Favorites {
    /// Read the latest profile of `user`
    pub async fn load(user: &CurrentUser, store: Arc<dyn ProfileStore>) -> Result<Self, Error> {
        let profile = store.read_profile(&user.id).await?;
        Ok(Self { store, profile })
    }

    /// Wrap an already loaded profile
    pub fn from_profile(profile: Profile, store: Arc<dyn ProfileStore>) -> Self {
        Self { store, profile }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn set(&self) -> &FavoriteSet {
        &self.profile.favorites
    }

    pub fn contains(&self, id: PoemId) -> bool {
        self.profile.favorites.contains(id)
    }

    /// Add `id` if absent, remove it otherwise. Returns whether it is now saved.
    pub async fn toggle(&mut self, id: PoemId) -> Result<bool, Error> {
        let next = self.profile.favorites.toggled(id);
        self.persist(next).await?;
        Ok(self.contains(id))
    }

    /// Remove `id`
    pub async fn remove(&mut self, id: PoemId) -> Result<(), Error> {
        let next = self.profile.favorites.without(id);
        self.persist(next).await
    }

    /// Replace the local snapshot with the stored profile
    pub async fn refresh(&mut self) -> Result<(), Error> {
        self.profile = self.store.read_profile(&self.profile.id).await?;
        Ok(())
    }

    async fn persist(&mut self, next: FavoriteSet) -> Result<(), Error> {
        debug!(
            "Saving favorites for {}: {:?}",
            self.profile.id,
            next.ids()
        );
        match self.store.update_favorites(&self.profile.id, &next).await {
            Ok(()) => {
                self.profile.favorites = next;
                Ok(())
            }
            Err(e) => {
                error!("Error saving favorites for {}: {}", self.profile.id, e);
                Err(Error::FavoritesPersist(e.to_string()))
            }
        }
    }
}

/// Favorite state of the poem on a detail page
pub struct FavoriteToggle {
    poem_id: PoemId,
    favorites: Option<Favorites>,
    is_favorite: bool,
}

impl FavoriteToggle {
    /// No signed-in user: toggling reports [`Error::NotSignedIn`]
    pub fn signed_out(poem_id: PoemId) -> Self {
        Self {
            poem_id,
            favorites: None,
            is_favorite: false,
        }
    }

    /// Load the favorites of `user` and check `poem_id` against them.
    ///
    /// Without a user nothing is read from the store.
    pub async fn load(
        user: Option<&CurrentUser>,
        store: Arc<dyn ProfileStore>,
        poem_id: PoemId,
    ) -> Result<Self, Error> {
        let user = match user {
            Some(user) => user,
            None => return Ok(Self::signed_out(poem_id)),
        };
        let favorites = Favorites::load(user, store).await?;
        let is_favorite = favorites.contains(poem_id);
        Ok(Self {
            poem_id,
            favorites: Some(favorites),
            is_favorite,
        })
    }

    pub fn poem_id(&self) -> PoemId {
        self.poem_id
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    pub fn is_signed_in(&self) -> bool {
        self.favorites.is_some()
    }

    /// Owner of the loaded favorites, `None` when signed out
    pub fn user_id(&self) -> Option<&str> {
        self.favorites.as_ref().map(|f| f.profile().id.as_str())
    }

    pub fn favorites(&self) -> Option<&FavoriteSet> {
        self.favorites.as_ref().map(Favorites::set)
    }

    /// Flip the poem in or out of the favorites. Returns the new indicator.
    pub async fn toggle(&mut self) -> Result<bool, Error> {
        let favorites = self.favorites.as_mut().ok_or(Error::NotSignedIn)?;
        self.is_favorite = favorites.toggle(self.poem_id).await?;
        Ok(self.is_favorite)
    }

    /// Re-read the stored favorites
    pub async fn refresh(&mut self) -> Result<(), Error> {
        let favorites = self.favorites.as_mut().ok_or(Error::NotSignedIn)?;
        favorites.refresh().await?;
        self.is_favorite = favorites.contains(self.poem_id);
        Ok(())
    }
}
