//! Poem detail page: the poem, its comments, likes and the favorite button

use chrono::Local;
use log::{debug, error};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::binder::SessionBinder;
use crate::config::placeholder_avatar;
use crate::error::Error;
use crate::favorites::FavoriteToggle;
use crate::poetry::{Poem, PoemId, PoetryStore};
use crate::profile::ProfileStore;
use crate::view::ViewScope;

/// Author shown for comments written while signed out
pub const ANONYMOUS_AUTHOR: &str = "当前用户";

/// A comment on the detail page. Comments live only in the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: u64,
    pub author: String,
    pub avatar: String,
    pub content: String,
    pub datetime: String,
}

fn seed_comments(avatar_base: &str) -> Vec<Comment> {
    vec![
        Comment {
            id: 1,
            author: "诗词爱好者".to_string(),
            avatar: placeholder_avatar(avatar_base, "1"),
            content: "这首诗表达了游子思乡之情，语言朴素却意味深长。".to_string(),
            datetime: "2024-01-15 10:30".to_string(),
        },
        Comment {
            id: 2,
            author: "文学研究者".to_string(),
            avatar: placeholder_avatar(avatar_base, "2"),
            content: "李白通过简单的场景描写，展现了深刻的思乡情感。".to_string(),
            datetime: "2024-01-14 15:20".to_string(),
        },
    ]
}

/// What the detail page renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSnapshot {
    pub poem: Option<Poem>,
    pub loading: bool,
    pub comments: Vec<Comment>,
    pub is_favorite: bool,
}

struct DetailState {
    poem_id: Option<PoemId>,
    poem: Option<Poem>,
    loading: bool,
    comments: Vec<Comment>,
}

/// Controller of one mounted detail page
pub struct PoetryDetailView {
    poetry: Arc<dyn PoetryStore>,
    profiles: Arc<dyn ProfileStore>,
    binder: Arc<SessionBinder>,
    avatar_base: String,
    scope: ViewScope,
    state: Mutex<DetailState>,
    /// Favorite state of the loaded poem; `None` when the profile read failed
    favorite: Mutex<Option<FavoriteToggle>>,
}

impl PoetryDetailView {
    pub fn mount(
        poetry: Arc<dyn PoetryStore>,
        profiles: Arc<dyn ProfileStore>,
        binder: Arc<SessionBinder>,
        avatar_base: &str,
    ) -> Self {
        Self {
            poetry,
            profiles,
            binder,
            avatar_base: avatar_base.to_string(),
            scope: ViewScope::new(),
            state: Mutex::new(DetailState {
                poem_id: None,
                poem: None,
                loading: true,
                comments: Vec::new(),
            }),
            favorite: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> DetailSnapshot {
        let user = self.binder.current_user();
        let user_id = user.as_ref().map(|u| u.id.as_str());
        let is_favorite = self
            .favorite
            .lock()
            .await
            .as_ref()
            .map_or(false, |toggle| toggle.user_id() == user_id && toggle.is_favorite());
        let state = self.state.lock().await;
        DetailSnapshot {
            poem: state.poem.clone(),
            loading: state.loading,
            comments: state.comments.clone(),
            is_favorite,
        }
    }

    /// Load the poem with route id `id`, its comments and the favorite state.
    ///
    /// Waits for the session binder to settle first. Returns whether the
    /// results were applied.
    pub async fn load(&self, id: &str) -> bool {
        self.state.lock().await.loading = true;
        self.binder.ready().await;
        let ticket = self.scope.begin();

        let poem_id = id.trim().parse::<PoemId>().ok();
        let poem = match poem_id {
            Some(poem_id) => match self.poetry.get_by_id(poem_id).await {
                Ok(poem) => poem,
                Err(e) => {
                    error!("Error fetching poetry detail {}: {}", poem_id, e);
                    None
                }
            },
            None => {
                debug!("Poetry id {:?} is not a number", id);
                None
            }
        };

        let favorite = match poem_id {
            Some(poem_id) => self.load_favorite(poem_id).await,
            None => None,
        };

        if !self.scope.is_current(ticket) {
            debug!("Dropping detail response for {}", id);
            return false;
        }

        *self.favorite.lock().await = favorite;
        let mut state = self.state.lock().await;
        state.poem_id = poem_id;
        state.poem = poem;
        state.comments = seed_comments(&self.avatar_base);
        state.loading = false;
        true
    }

    async fn load_favorite(&self, poem_id: PoemId) -> Option<FavoriteToggle> {
        let user = self.binder.current_user();
        match FavoriteToggle::load(user.as_deref(), self.profiles.clone(), poem_id).await {
            Ok(toggle) => Some(toggle),
            Err(e) => {
                error!("Error fetching user data or checking favorite status: {}", e);
                None
            }
        }
    }

    /// Add one to the like counter. The count is not sent anywhere and
    /// resets on the next load.
    pub async fn like(&self) -> Option<u64> {
        let mut state = self.state.lock().await;
        state.poem.as_mut().map(|poem| {
            poem.likes += 1;
            poem.likes
        })
    }

    /// Post a comment as the current user
    pub async fn add_comment(&self, text: &str) -> Result<Comment, Error> {
        let content = text.trim();
        if content.is_empty() {
            return Err(Error::EmptyComment);
        }

        let (author, avatar) = match self.binder.current_user() {
            Some(user) => (user.username.clone(), user.avatar.clone()),
            None => (
                ANONYMOUS_AUTHOR.to_string(),
                placeholder_avatar(&self.avatar_base, "3"),
            ),
        };

        let mut state = self.state.lock().await;
        let comment = Comment {
            id: state.comments.len() as u64 + 1,
            author,
            avatar,
            content: content.to_string(),
            datetime: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        state.comments.insert(0, comment.clone());
        Ok(comment)
    }

    /// Flip the favorite state of the loaded poem for the current user.
    /// Returns the new indicator.
    ///
    /// Signed out, nothing is sent. When the loaded favorites belong to
    /// another user, or could not be read, they are read again first.
    pub async fn toggle_favorite(&self) -> Result<bool, Error> {
        self.binder.ready().await;
        let user = self.binder.current_user().ok_or(Error::NotSignedIn)?;
        let poem_id = self.state.lock().await.poem_id.ok_or(Error::NotFound)?;

        let mut favorite = self.favorite.lock().await;
        let loaded = favorite.as_ref().map_or(false, |toggle| {
            toggle.poem_id() == poem_id && toggle.user_id() == Some(user.id.as_str())
        });
        if !loaded {
            debug!("Reloading favorites of {} before toggling {}", user.id, poem_id);
            *favorite = None;
            let toggle =
                FavoriteToggle::load(Some(&*user), self.profiles.clone(), poem_id).await?;
            *favorite = Some(toggle);
        }

        match favorite.as_mut() {
            Some(toggle) => toggle.toggle().await,
            None => Err(Error::NotLoaded),
        }
    }

    /// Tear the view down; in-flight responses are discarded
    pub fn unmount(&self) {
        self.scope.unmount();
    }
}
