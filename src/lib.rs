//! Shici client core
//!
//! The client side of a classical Chinese poetry site: the session binder
//! that keeps the signed-in user in step with the auth provider, the
//! favorites toggle, the poetry list filters mirrored in the URL, and the
//! page controllers built on top of them.

pub mod auth;
pub mod binder;
pub mod config;
pub mod error;
pub mod favorites;
pub mod fetch;
pub mod filter;
pub mod poetry;
pub mod postgrest;
pub mod profile;
pub mod view;
pub mod views;

#[cfg(test)]
mod testing;

use reqwest::Client;
use std::sync::Arc;

use crate::auth::Auth;
use crate::binder::SessionBinder;
use crate::config::{ClientOptions, ProfileBackend};
use crate::poetry::{JsonServerPoetry, PoetryStore, SupabasePoetry};
use crate::postgrest::PostgrestClient;
use crate::profile::{PostgrestProfileStore, ProfileStore};
use crate::views::{
    LoginView, PoetryDetailView, PoetryListView, RegisterView, UserCenterView,
};

/// The main entry point: every collaborator of the site, wired from one set
/// of options
pub struct Shici {
    /// HTTP client shared by every service
    pub http_client: Client,
    /// Auth client holding the session
    pub auth: Arc<Auth>,
    /// Client options
    pub options: ClientOptions,
    profiles: Arc<dyn ProfileStore>,
    poetry: Arc<dyn PoetryStore>,
    collections: Arc<dyn PoetryStore>,
}

impl Shici {
    /// Create a new client
    ///
    /// # Example
    ///
    /// ```
    /// use shici_client::{config::ClientOptions, Shici};
    ///
    /// let options = ClientOptions::default()
    ///     .with_supabase("https://your-project-url.supabase.co", "your-anon-key")
    ///     .with_data_url("http://localhost:3001");
    /// let shici = Shici::new(options);
    /// let list = shici.poetry_list("/tang-poetry", "page=2");
    /// ```
    pub fn new(options: ClientOptions) -> Self {
        let http_client = Client::new();
        let timeout = options.request_timeout;

        let auth = Arc::new(Auth::new(
            &options.supabase_url,
            &options.supabase_key,
            http_client.clone(),
            timeout,
        ));

        let data_server = Arc::new(JsonServerPoetry::new(
            &options.data_url,
            http_client.clone(),
            timeout,
        ));

        let profiles: Arc<dyn ProfileStore> = match options.profile_backend {
            ProfileBackend::Supabase => Arc::new(PostgrestProfileStore::new(
                PostgrestClient::new(
                    &options.supabase_url,
                    &options.supabase_key,
                    &options.profile_table,
                    http_client.clone(),
                    timeout,
                ),
                Some(auth.clone()),
            )),
            ProfileBackend::DataServer => data_server.clone(),
        };

        let collections = Arc::new(SupabasePoetry::new(
            PostgrestClient::new(
                &options.supabase_url,
                &options.supabase_key,
                &options.poetry_table,
                http_client.clone(),
                timeout,
            ),
            Some(auth.clone()),
        ));

        Self {
            http_client,
            auth,
            options,
            profiles,
            poetry: data_server,
            collections,
        }
    }

    /// Create a client from the environment, see [`ClientOptions::from_env`]
    pub fn from_env() -> Self {
        Self::new(ClientOptions::from_env())
    }

    /// Profile storage in use
    pub fn profiles(&self) -> Arc<dyn ProfileStore> {
        self.profiles.clone()
    }

    /// Poems served by the data server
    pub fn poetry(&self) -> Arc<dyn PoetryStore> {
        self.poetry.clone()
    }

    /// Start the process-wide session binder.
    ///
    /// Call once, from within a tokio runtime, and share the result.
    pub fn start_session_binder(&self) -> Arc<SessionBinder> {
        SessionBinder::start(
            self.auth.clone(),
            self.profiles.clone(),
            &self.options.avatar_base,
        )
    }

    /// Mount the poetry list at `path` with the address bar's `query`
    pub fn poetry_list(&self, path: &str, query: &str) -> PoetryListView {
        PoetryListView::mount(self.poetry.clone(), self.options.page_size, path, query)
    }

    /// Mount a poem detail page
    pub fn poetry_detail(&self, binder: Arc<SessionBinder>) -> PoetryDetailView {
        PoetryDetailView::mount(
            self.poetry.clone(),
            self.profiles.clone(),
            binder,
            &self.options.avatar_base,
        )
    }

    pub fn login(&self, binder: Arc<SessionBinder>) -> LoginView {
        LoginView::mount(binder)
    }

    pub fn register(&self, binder: Arc<SessionBinder>) -> RegisterView {
        RegisterView::mount(binder)
    }

    /// Mount the user center; collected poems come from the provider's table
    pub fn user_center(&self, binder: Arc<SessionBinder>) -> UserCenterView {
        UserCenterView::mount(binder, self.profiles.clone(), self.collections.clone())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::binder::{BinderState, CurrentUser, SessionBinder};
    pub use crate::config::{ClientOptions, ProfileBackend};
    pub use crate::error::Error;
    pub use crate::poetry::{Poem, PoemId, PoemSummary, PoetryStore};
    pub use crate::profile::{FavoriteSet, Profile, ProfileStore};
    pub use crate::Shici;
}
