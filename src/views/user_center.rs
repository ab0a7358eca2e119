//! User center: profile and collected poems

use log::{debug, error};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::binder::{CurrentUser, SessionBinder};
use crate::error::Error;
use crate::favorites::Favorites;
use crate::poetry::{PoemId, PoemSummary, PoetryStore};
use crate::profile::{Profile, ProfileStore};
use crate::view::ViewScope;

/// Shown when removing before the profile was loaded
pub const NOT_LOADED: &str = "用户数据未加载。";

/// Shown when the loaded profile belongs to a user who is no longer signed in
pub const SESSION_CHANGED: &str = "登录用户已变更，请重新加载。";

/// What the user center renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserCenterSnapshot {
    pub loading: bool,
    pub signed_in: bool,
    pub profile: Option<Profile>,
    pub collected: Vec<PoemSummary>,
    /// Last user-visible failure
    pub message: Option<String>,
}

/// Controller of the mounted user center
pub struct UserCenterView {
    binder: Arc<SessionBinder>,
    profiles: Arc<dyn ProfileStore>,
    poetry: Arc<dyn PoetryStore>,
    scope: ViewScope,
    state: Mutex<UserCenterSnapshot>,
    favorites: Mutex<Option<Favorites>>,
}

impl UserCenterView {
    pub fn mount(
        binder: Arc<SessionBinder>,
        profiles: Arc<dyn ProfileStore>,
        poetry: Arc<dyn PoetryStore>,
    ) -> Self {
        Self {
            binder,
            profiles,
            poetry,
            scope: ViewScope::new(),
            state: Mutex::new(UserCenterSnapshot {
                loading: true,
                ..UserCenterSnapshot::default()
            }),
            favorites: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> UserCenterSnapshot {
        self.state.lock().await.clone()
    }

    /// The settled session user. Signed out, the loaded data is dropped.
    async fn session_user(&self) -> Result<Arc<CurrentUser>, Error> {
        self.binder.ready().await;
        if let Some(user) = self.binder.current_user() {
            return Ok(user);
        }
        // lock order: favorites before state
        let mut stored = self.favorites.lock().await;
        let mut state = self.state.lock().await;
        *stored = None;
        *state = UserCenterSnapshot::default();
        Err(Error::NotSignedIn)
    }

    /// Load the profile of the current user and the poems it collected.
    ///
    /// Waits for the session binder to settle first. Returns whether the
    /// results were applied; they are dropped when the view was unmounted,
    /// a newer load started, or the signed-in user changed meanwhile.
    pub async fn load(&self) -> Result<bool, Error> {
        let user = self.session_user().await?;

        let ticket = self.scope.begin();
        self.state.lock().await.loading = true;

        let result = async {
            let favorites = Favorites::load(&user, self.profiles.clone()).await?;
            let collected = self.poetry.get_by_ids(favorites.set().ids()).await?;
            Ok::<_, Error>((favorites, collected))
        }
        .await;

        if !self.scope.is_current(ticket) {
            debug!("Dropping user center response for {}", user.id);
            return Ok(false);
        }
        let same_user = self
            .binder
            .current_user()
            .map_or(false, |current| current.id == user.id);
        if !same_user {
            debug!("Session moved away from {} during load", user.id);
            return Ok(false);
        }

        let mut stored = self.favorites.lock().await;
        let mut state = self.state.lock().await;
        state.loading = false;
        state.signed_in = true;
        match result {
            Ok((favorites, collected)) => {
                state.profile = Some(favorites.profile().clone());
                state.collected = collected;
                state.message = None;
                *stored = Some(favorites);
                Ok(true)
            }
            Err(e) => {
                error!("Error fetching user data: {}", e);
                state.message = Some(format!("获取用户数据失败：{}", e));
                Err(e)
            }
        }
    }

    /// Remove `poem_id` from the collection.
    ///
    /// Nothing is written unless the loaded profile belongs to the user
    /// signed in right now.
    pub async fn remove_favorite(&self, poem_id: PoemId) -> Result<(), Error> {
        let user = self.session_user().await?;

        let mut stored = self.favorites.lock().await;
        let owner = stored.as_ref().map(|favorites| favorites.profile().id.clone());
        match owner {
            None => {
                self.state.lock().await.message = Some(NOT_LOADED.to_string());
                return Err(Error::NotLoaded);
            }
            Some(owner) if owner != user.id => {
                debug!("Loaded profile of {} no longer matches {}", owner, user.id);
                *stored = None;
                let mut state = self.state.lock().await;
                *state = UserCenterSnapshot {
                    signed_in: true,
                    message: Some(SESSION_CHANGED.to_string()),
                    ..UserCenterSnapshot::default()
                };
                return Err(Error::SessionChanged);
            }
            Some(_) => {}
        }
        let favorites = match stored.as_mut() {
            Some(favorites) => favorites,
            None => return Err(Error::NotLoaded),
        };

        let result = favorites.remove(poem_id).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(()) => {
                state.profile = Some(favorites.profile().clone());
                state.collected.retain(|poem| poem.id != poem_id);
                state.message = None;
                Ok(())
            }
            Err(e) => {
                error!("Error removing favorite {}: {}", poem_id, e);
                state.message = Some(format!("移除收藏失败：{}", e));
                Err(e)
            }
        }
    }

    /// Tear the view down; in-flight responses are discarded
    pub fn unmount(&self) {
        self.scope.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FavoriteSet;
    use crate::testing::{poem, session_for, wait_for_user, FakeAuth, FakePoetry, FakeProfiles};

    const AVATARS: &str = "https://a.test";

    struct Fixture {
        view: UserCenterView,
        auth: Arc<FakeAuth>,
        binder: Arc<SessionBinder>,
        profiles: Arc<FakeProfiles>,
    }

    fn poetry() -> Arc<FakePoetry> {
        Arc::new(FakePoetry::new(vec![
            poem(1, "静夜思", "李白", "唐代"),
            poem(2, "春晓", "孟浩然", "唐代"),
            poem(3, "水调歌头", "苏轼", "宋代"),
        ]))
    }

    fn profiles_with(favorites: Vec<PoemId>) -> Arc<FakeProfiles> {
        let profiles = Arc::new(FakeProfiles::new());
        let mut profile = Profile::empty("u1");
        profile.favorites = FavoriteSet::from(favorites);
        profiles.insert(profile);
        profiles
    }

    async fn fixture(signed_in: bool, favorites: Vec<PoemId>) -> Fixture {
        let auth = Arc::new(if signed_in {
            FakeAuth::with_session(session_for("u1", None))
        } else {
            FakeAuth::new()
        });
        let profiles = profiles_with(favorites);

        let binder = SessionBinder::start(auth.clone(), profiles.clone(), AVATARS);
        binder.ready().await;

        let view = UserCenterView::mount(binder.clone(), profiles.clone(), poetry());
        Fixture {
            view,
            auth,
            binder,
            profiles,
        }
    }

    #[tokio::test]
    async fn test_signed_out() {
        let f = fixture(false, vec![]).await;
        assert!(matches!(f.view.load().await, Err(Error::NotSignedIn)));

        let snapshot = f.view.snapshot().await;
        assert!(!snapshot.signed_in);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_loads_collected_poems() {
        let f = fixture(true, vec![3, 1]).await;
        assert!(f.view.load().await.unwrap());

        let snapshot = f.view.snapshot().await;
        let mut ids: Vec<PoemId> = snapshot.collected.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(snapshot.profile.unwrap().favorites.ids(), &[3, 1]);
    }

    #[tokio::test]
    async fn test_remove_favorite_updates_both_lists() {
        let f = fixture(true, vec![1, 2]).await;
        f.view.load().await.unwrap();

        f.view.remove_favorite(1).await.unwrap();
        let snapshot = f.view.snapshot().await;
        assert_eq!(snapshot.collected.len(), 1);
        assert_eq!(snapshot.profile.unwrap().favorites.ids(), &[2]);
        assert_eq!(f.profiles.get("u1").unwrap().favorites.ids(), &[2]);
    }

    #[tokio::test]
    async fn test_remove_failure_keeps_lists() {
        let f = fixture(true, vec![1, 2]).await;
        f.view.load().await.unwrap();
        f.profiles.fail_writes(true);

        assert!(f.view.remove_favorite(1).await.is_err());
        let snapshot = f.view.snapshot().await;
        assert_eq!(snapshot.collected.len(), 2);
        assert!(snapshot.message.unwrap().starts_with("移除收藏失败："));
    }

    #[tokio::test]
    async fn test_remove_before_load() {
        let f = fixture(true, vec![1]).await;
        assert!(matches!(f.view.remove_favorite(1).await, Err(Error::NotLoaded)));
        assert_eq!(f.view.snapshot().await.message.as_deref(), Some(NOT_LOADED));
        assert!(f.profiles.writes().is_empty());
    }

    #[tokio::test]
    async fn test_remove_after_sign_out_sends_nothing() {
        let f = fixture(true, vec![1, 2]).await;
        f.view.load().await.unwrap();

        f.binder.sign_out().await.unwrap();
        wait_for_user(&f.binder, None).await;

        assert!(matches!(f.view.remove_favorite(1).await, Err(Error::NotSignedIn)));
        assert!(f.profiles.writes().is_empty());
        assert_eq!(f.profiles.get("u1").unwrap().favorites.ids(), &[1, 2]);

        let snapshot = f.view.snapshot().await;
        assert!(!snapshot.signed_in);
        assert!(snapshot.profile.is_none());
        assert!(snapshot.collected.is_empty());
    }

    #[tokio::test]
    async fn test_remove_after_user_switch_is_refused() {
        let f = fixture(true, vec![1, 2]).await;
        let mut other = Profile::empty("u2");
        other.favorites = FavoriteSet::from(vec![3]);
        f.profiles.insert(other);
        f.view.load().await.unwrap();

        f.auth.emit(Some(session_for("u2", None)));
        wait_for_user(&f.binder, Some("u2")).await;

        assert!(matches!(f.view.remove_favorite(1).await, Err(Error::SessionChanged)));
        assert!(f.profiles.writes().is_empty());
        assert_eq!(f.profiles.get("u1").unwrap().favorites.ids(), &[1, 2]);
        let snapshot = f.view.snapshot().await;
        assert!(snapshot.collected.is_empty());
        assert_eq!(snapshot.message.as_deref(), Some(SESSION_CHANGED));

        assert!(f.view.load().await.unwrap());
        let snapshot = f.view.snapshot().await;
        assert_eq!(snapshot.profile.unwrap().id, "u2");
        assert_eq!(snapshot.collected.len(), 1);
    }

    #[tokio::test]
    async fn test_load_during_binder_startup_waits_for_user() {
        let auth = Arc::new(FakeAuth::with_session(session_for("u1", None)));
        let profiles = profiles_with(vec![2]);
        let gate = profiles.gate("u1");

        let binder = SessionBinder::start(auth, profiles.clone(), AVATARS);
        let view = Arc::new(UserCenterView::mount(
            binder.clone(),
            profiles.clone(),
            poetry(),
        ));

        let pending = {
            let view = view.clone();
            tokio::spawn(async move { view.load().await })
        };
        profiles.wait_started(1).await;
        assert!(binder.is_loading());
        gate.notify_one();

        assert!(pending.await.unwrap().unwrap());
        let snapshot = view.snapshot().await;
        assert!(snapshot.signed_in);
        assert_eq!(snapshot.collected.len(), 1);
    }

    #[tokio::test]
    async fn test_load_after_unmount_is_dropped() {
        let f = fixture(true, vec![1]).await;
        f.view.unmount();

        assert!(!f.view.load().await.unwrap());
        let snapshot = f.view.snapshot().await;
        assert!(snapshot.profile.is_none());
        assert!(snapshot.collected.is_empty());
    }
}
