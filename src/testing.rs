//! In-process collaborators for unit tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

use crate::auth::{AuthChangeEvent, AuthProvider, AuthStateChange, AuthUser, Session, SessionSubscription};
use crate::binder::SessionBinder;
use crate::error::Error;
use crate::poetry::{Poem, PoemId, PoemSummary, PoetryQuery, PoetryStore};
use crate::profile::{FavoriteSet, Profile, ProfileStore};

pub(crate) fn session_for(id: &str, email: Option<&str>) -> Session {
    Session::new(
        format!("token-{}", id),
        "refresh".to_string(),
        AuthUser {
            id: id.to_string(),
            email: email.map(str::to_string),
        },
        3600,
    )
}

async fn wait_until(counter: &AtomicUsize, n: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while counter.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("timed out waiting for counter");
}

/// Wait until the binder publishes `id` as the current user
pub(crate) async fn wait_for_user(binder: &SessionBinder, id: Option<&str>) {
    let mut rx = binder.subscribe();
    let _ = tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|state| state.current_user.as_ref().map(|u| u.id.as_str()) == id),
    )
    .await
    .expect("timed out waiting for the session user");
}

pub(crate) struct FakeAuth {
    session: Mutex<Option<Session>>,
    changes: broadcast::Sender<AuthStateChange>,
    sign_in_error: Mutex<Option<String>>,
}

impl FakeAuth {
    pub(crate) fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            session: Mutex::new(None),
            changes,
            sign_in_error: Mutex::new(None),
        }
    }

    pub(crate) fn with_session(session: Session) -> Self {
        let auth = Self::new();
        *auth.session.lock().unwrap() = Some(session);
        auth
    }

    pub(crate) fn fail_sign_in(&self, message: &str) {
        *self.sign_in_error.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn emit(&self, session: Option<Session>) {
        let event = if session.is_some() {
            AuthChangeEvent::SignedIn
        } else {
            AuthChangeEvent::SignedOut
        };
        *self.session.lock().unwrap() = session.clone();
        let _ = self.changes.send(AuthStateChange { event, session });
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<Session, Error> {
        if let Some(message) = self.sign_in_error.lock().unwrap().clone() {
            return Err(Error::Auth(message));
        }
        let session = session_for(email, Some(email));
        self.emit(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<Option<Session>, Error> {
        if email.starts_with("taken") {
            return Err(Error::Auth("User already registered".to_string()));
        }
        Ok(None)
    }

    async fn sign_out(&self) -> Result<(), Error> {
        self.emit(None);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, Error> {
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.changes.subscribe())
    }
}

#[derive(Default)]
pub(crate) struct FakeProfiles {
    profiles: Mutex<HashMap<String, Profile>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failing_reads: Mutex<HashSet<String>>,
    failing_writes: AtomicBool,
    started: AtomicUsize,
    completed: AtomicUsize,
    writes: Mutex<Vec<(String, FavoriteSet)>>,
}

impl FakeProfiles {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
    }

    pub(crate) fn get(&self, id: &str) -> Option<Profile> {
        self.profiles.lock().unwrap().get(id).cloned()
    }

    /// Hold reads of `id` until the returned handle is notified
    pub(crate) fn gate(&self, id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(id.to_string(), gate.clone());
        gate
    }

    pub(crate) fn fail_reads_for(&self, id: &str) {
        self.failing_reads.lock().unwrap().insert(id.to_string());
    }

    pub(crate) fn heal_reads_for(&self, id: &str) {
        self.failing_reads.lock().unwrap().remove(id);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.failing_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn reads(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn writes(&self) -> Vec<(String, FavoriteSet)> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) async fn wait_started(&self, n: usize) {
        wait_until(&self.started, n).await;
    }

    pub(crate) async fn wait_completed(&self, n: usize) {
        wait_until(&self.completed, n).await;
    }
}

#[async_trait]
impl ProfileStore for FakeProfiles {
    async fn read_profile(&self, id: &str) -> Result<Profile, Error> {
        self.started.fetch_add(1, Ordering::SeqCst);
        // gates hold a single read
        let gate = self.gates.lock().unwrap().remove(id);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let result = if self.failing_reads.lock().unwrap().contains(id) {
            Err(Error::database("connection reset"))
        } else {
            self.get(id).ok_or(Error::NotFound)
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn update_favorites(&self, id: &str, favorites: &FavoriteSet) -> Result<(), Error> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(Error::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(id).ok_or(Error::NotFound)?;
        profile.favorites = favorites.clone();
        self.writes
            .lock()
            .unwrap()
            .push((id.to_string(), favorites.clone()));
        Ok(())
    }
}

pub(crate) fn poem(id: PoemId, title: &str, author: &str, dynasty: &str) -> Poem {
    Poem {
        id,
        title: title.to_string(),
        author: author.to_string(),
        dynasty: dynasty.to_string(),
        content: format!("{}的诗句", title),
        background: None,
        analysis: None,
        likes: 10,
    }
}

fn summary(poem: &Poem) -> PoemSummary {
    PoemSummary {
        id: poem.id,
        title: poem.title.clone(),
        author: poem.author.clone(),
        dynasty: poem.dynasty.clone(),
        content: poem.content.clone(),
        likes: poem.likes,
    }
}

#[derive(Default)]
pub(crate) struct FakePoetry {
    poems: Mutex<Vec<Poem>>,
    queries: Mutex<Vec<PoetryQuery>>,
    failing: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakePoetry {
    pub(crate) fn new(poems: Vec<Poem>) -> Self {
        Self {
            poems: Mutex::new(poems),
            ..Self::default()
        }
    }

    pub(crate) fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn queries(&self) -> Vec<PoetryQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Hold every request until the returned handle is notified
    pub(crate) fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    async fn pass(&self) -> Result<(), Error> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::general("data server unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PoetryStore for FakePoetry {
    async fn list(&self, query: &PoetryQuery) -> Result<Vec<PoemSummary>, Error> {
        self.queries.lock().unwrap().push(query.clone());
        self.pass().await?;
        let poems = self.poems.lock().unwrap();
        Ok(poems
            .iter()
            .filter(|p| query.dynasty.as_ref().map_or(true, |d| &p.dynasty == d))
            .filter(|p| query.author.as_ref().map_or(true, |a| &p.author == a))
            .filter(|p| {
                query
                    .search
                    .as_ref()
                    .map_or(true, |s| p.title.contains(s.as_str()) || p.content.contains(s.as_str()))
            })
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .map(summary)
            .collect())
    }

    async fn get_by_id(&self, id: PoemId) -> Result<Option<Poem>, Error> {
        self.pass().await?;
        Ok(self.poems.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn get_by_ids(&self, ids: &[PoemId]) -> Result<Vec<PoemSummary>, Error> {
        self.pass().await?;
        Ok(self
            .poems
            .lock()
            .unwrap()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(summary)
            .collect())
    }
}
