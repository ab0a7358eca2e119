//! Keeps the application's current user in step with the auth session.
//!
//! The binder listens for session changes and, for each non-empty session,
//! looks up the matching profile and publishes the merged [`CurrentUser`].
//! The one-shot initial session fetch and the subscription feed the same
//! state cell. Every resolution is numbered when it is issued and only a
//! resolution newer than the last applied one may overwrite the cell, so an
//! old profile lookup finishing late can never replace a newer user.

use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::{AuthProvider, Session};
use crate::config::placeholder_avatar;
use crate::error::Error;
use crate::profile::{FavoriteSet, Profile, ProfileStore};

/// The signed-in user as the views see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub username: String,
    pub avatar: String,
    pub favorites: FavoriteSet,
}

impl CurrentUser {
    /// Merge a session identity with its stored profile
    pub fn merge(session: &Session, profile: Profile, avatar_base: &str) -> Self {
        let user = &session.user;
        let username = profile
            .username
            .filter(|name| !name.is_empty())
            .or_else(|| user.email.clone())
            .unwrap_or_else(|| user.id.clone());
        let avatar = profile
            .avatar
            .filter(|avatar| !avatar.is_empty())
            .unwrap_or_else(|| placeholder_avatar(avatar_base, &user.id));

        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username,
            avatar,
            favorites: profile.favorites,
        }
    }
}

/// Snapshot published to consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderState {
    pub current_user: Option<Arc<CurrentUser>>,
    pub loading: bool,
}

struct Cell {
    applied: u64,
    initializing: bool,
    in_flight: usize,
    current_user: Option<Arc<CurrentUser>>,
}

struct Shared {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    avatar_base: String,
    next_seq: AtomicU64,
    closed: AtomicBool,
    cell: Mutex<Cell>,
    tx: watch::Sender<BinderState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Cell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, cell: &Cell) {
        self.tx.send_replace(BinderState {
            current_user: cell.current_user.clone(),
            loading: cell.initializing || cell.in_flight > 0,
        });
    }

    fn issue(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install the outcome of resolution `seq` unless a newer one is in
    fn apply(&self, seq: u64, user: Option<CurrentUser>) -> bool {
        let mut cell = self.lock();

        let fresh = seq > cell.applied && !self.closed.load(Ordering::SeqCst);
        if fresh {
            cell.applied = seq;
            cell.current_user = user.map(Arc::new);
        } else {
            warn!(
                "Discarding stale session resolution {} (last applied {})",
                seq, cell.applied
            );
        }
        cell.initializing = false;
        self.publish(&cell);
        fresh
    }

    async fn resolve(&self, seq: u64, session: Option<Session>) -> bool {
        let session = match session {
            Some(session) => session,
            None => {
                debug!("Resolution {}: no session", seq);
                return self.apply(seq, None);
            }
        };

        match self.profiles.read_profile(&session.user.id).await {
            Ok(profile) => {
                debug!("Resolution {}: profile for {}", seq, session.user.id);
                let user = CurrentUser::merge(&session, profile, &self.avatar_base);
                self.apply(seq, Some(user))
            }
            Err(e) => {
                error!("Error fetching user profile for {}: {}", session.user.id, e);
                self.apply(seq, None)
            }
        }
    }

    async fn fetch_current(&self) -> Option<Session> {
        match self.auth.current_session().await {
            Ok(session) => session,
            Err(e) => {
                error!("Error reading current session: {}", e);
                None
            }
        }
    }

    fn begin_operation(&self) -> OperationGuard<'_> {
        let mut cell = self.lock();
        cell.in_flight += 1;
        self.publish(&cell);
        OperationGuard { shared: self }
    }
}

/// Keeps `loading` raised while an auth call runs, even if its future is dropped
struct OperationGuard<'a> {
    shared: &'a Shared,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        let mut cell = self.shared.lock();
        cell.in_flight = cell.in_flight.saturating_sub(1);
        self.shared.publish(&cell);
    }
}

/// Process-scoped owner of the current user
pub struct SessionBinder {
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionBinder {
    /// Subscribe to `auth` and request the current session once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        avatar_base: &str,
    ) -> Arc<Self> {
        let (tx, _) = watch::channel(BinderState {
            current_user: None,
            loading: true,
        });

        let shared = Arc::new(Shared {
            auth,
            profiles,
            avatar_base: avatar_base.to_string(),
            next_seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            cell: Mutex::new(Cell {
                applied: 0,
                initializing: true,
                in_flight: 0,
                current_user: None,
            }),
            tx,
        });

        // Subscribe first so no change between the fetch and the
        // subscription is lost.
        let mut subscription = shared.auth.subscribe();
        let initial_seq = shared.issue();

        let listener = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                while let Some(change) = subscription.next().await {
                    if shared.closed.load(Ordering::SeqCst) {
                        break;
                    }
                    let seq = shared.issue();
                    debug!("Session change {:?} as resolution {}", change.event, seq);
                    match change.session {
                        None => {
                            shared.apply(seq, None);
                        }
                        session @ Some(_) => {
                            let shared = Arc::clone(&shared);
                            tokio::spawn(async move {
                                shared.resolve(seq, session).await;
                            });
                        }
                    }
                }
                debug!("Session listener stopped");
            })
        };

        let initial = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                let session = shared.fetch_current().await;
                shared.resolve(initial_seq, session).await;
            })
        };

        info!("Session binder started");
        Arc::new(Self {
            shared,
            tasks: Mutex::new(vec![listener, initial]),
        })
    }

    /// Latest published snapshot
    pub fn state(&self) -> BinderState {
        self.shared.tx.borrow().clone()
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<Arc<CurrentUser>> {
        self.shared.tx.borrow().current_user.clone()
    }

    /// Whether a resolution or auth call is outstanding
    pub fn is_loading(&self) -> bool {
        self.shared.tx.borrow().loading
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<BinderState> {
        self.shared.tx.subscribe()
    }

    /// Wait until nothing is loading and return that snapshot
    pub async fn ready(&self) -> BinderState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }

    /// Sign in; the provider's error is returned unchanged
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let _loading = self.shared.begin_operation();
        self.shared.auth.sign_in(email, password).await
    }

    /// Register a new account
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, Error> {
        let _loading = self.shared.begin_operation();
        self.shared.auth.sign_up(email, password).await
    }

    /// Sign out; the provider's error is returned unchanged
    pub async fn sign_out(&self) -> Result<(), Error> {
        let _loading = self.shared.begin_operation();
        self.shared.auth.sign_out().await
    }

    /// Re-read the current session and its profile.
    ///
    /// Returns whether the result was applied.
    pub async fn refresh(&self) -> bool {
        let seq = self.shared.issue();
        let session = self.shared.fetch_current().await;
        self.shared.resolve(seq, session).await
    }

    /// Unsubscribe and stop applying resolutions
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let tasks = std::mem::take(
            &mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for task in tasks {
            task.abort();
        }

        let mut cell = self.shared.lock();
        cell.initializing = false;
        self.shared.publish(&cell);
        info!("Session binder stopped");
    }
}

impl Drop for SessionBinder {
    fn drop(&mut self) {
        self.shutdown();
    }
}
