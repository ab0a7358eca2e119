//! Configuration options for the poetry site client

use std::env;
use std::time::Duration;

/// Default json-server address used by the site during development
pub const DEFAULT_DATA_URL: &str = "http://localhost:3001";

/// Default number of poems per list page
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Default placeholder avatar service, seeded by the user id
pub const DEFAULT_AVATAR_BASE: &str = "https://api.dicebear.com/7.x/miniavs/svg";

/// Where user profiles and their favorites are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfileBackend {
    /// The provider's profile table
    #[default]
    Supabase,
    /// `/users/{id}` on the poetry data server
    DataServer,
}

impl ProfileBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Some(ProfileBackend::Supabase),
            "data-server" | "json-server" => Some(ProfileBackend::DataServer),
            _ => None,
        }
    }
}

/// Configuration options for the client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The base URL of the auth/database provider
    pub supabase_url: String,

    /// The anonymous API key of the auth/database provider
    pub supabase_key: String,

    /// The base URL of the poetry data server
    pub data_url: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Poems per list page
    pub page_size: u32,

    /// Placeholder avatar base URL
    pub avatar_base: String,

    /// Table holding user profiles
    pub profile_table: String,

    /// Table holding poems on the provider side
    pub poetry_table: String,

    /// Where profiles are read and written
    pub profile_backend: ProfileBackend,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_key: String::new(),
            data_url: DEFAULT_DATA_URL.to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            page_size: DEFAULT_PAGE_SIZE,
            avatar_base: DEFAULT_AVATAR_BASE.to_string(),
            profile_table: "users".to_string(),
            poetry_table: "poetry".to_string(),
            profile_backend: ProfileBackend::default(),
        }
    }
}

impl ClientOptions {
    /// Build options from `SUPABASE_URL`, `SUPABASE_KEY`, `POETRY_DATA_URL`
    /// `POETRY_PAGE_SIZE` and `POETRY_PROFILE_BACKEND`, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(url) = env::var("SUPABASE_URL") {
            options.supabase_url = url;
        }
        if let Ok(key) = env::var("SUPABASE_KEY") {
            options.supabase_key = key;
        }
        if let Ok(url) = env::var("POETRY_DATA_URL") {
            options.data_url = url;
        }
        if let Some(size) = env::var("POETRY_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
        {
            options.page_size = size;
        }
        if let Some(backend) = env::var("POETRY_PROFILE_BACKEND")
            .ok()
            .and_then(|v| ProfileBackend::parse(&v))
        {
            options.profile_backend = backend;
        }

        options
    }

    /// Set the auth/database provider URL and key
    pub fn with_supabase(mut self, url: &str, key: &str) -> Self {
        self.supabase_url = url.trim_end_matches('/').to_string();
        self.supabase_key = key.to_string();
        self
    }

    /// Set the poetry data server URL
    pub fn with_data_url(mut self, value: &str) -> Self {
        self.data_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the list page size
    pub fn with_page_size(mut self, value: u32) -> Self {
        self.page_size = value.max(1);
        self
    }

    /// Set the placeholder avatar base URL
    pub fn with_avatar_base(mut self, value: &str) -> Self {
        self.avatar_base = value.to_string();
        self
    }

    /// Set the profile table
    pub fn with_profile_table(mut self, value: &str) -> Self {
        self.profile_table = value.to_string();
        self
    }

    /// Set the provider-side poetry table
    pub fn with_poetry_table(mut self, value: &str) -> Self {
        self.poetry_table = value.to_string();
        self
    }

    /// Set where profiles are kept
    pub fn with_profile_backend(mut self, value: ProfileBackend) -> Self {
        self.profile_backend = value;
        self
    }

    /// Placeholder avatar for a user id
    pub fn placeholder_avatar(&self, seed: &str) -> String {
        placeholder_avatar(&self.avatar_base, seed)
    }
}

/// Deterministic placeholder avatar URL for `seed`
pub fn placeholder_avatar(base: &str, seed: &str) -> String {
    format!("{}?seed={}", base, seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_trims_trailing_slash() {
        let options = ClientOptions::default()
            .with_supabase("https://example.supabase.co/", "anon")
            .with_data_url("http://localhost:3001/");

        assert_eq!(options.supabase_url, "https://example.supabase.co");
        assert_eq!(options.data_url, "http://localhost:3001");
        assert_eq!(options.supabase_key, "anon");
    }

    #[test]
    fn test_placeholder_avatar_is_seeded_by_id() {
        let options = ClientOptions::default();
        assert_eq!(
            options.placeholder_avatar("abc"),
            "https://api.dicebear.com/7.x/miniavs/svg?seed=abc"
        );
    }

    #[test]
    fn test_page_size_is_never_zero() {
        assert_eq!(ClientOptions::default().with_page_size(0).page_size, 1);
    }

    #[test]
    fn test_profile_backend_names() {
        assert_eq!(ProfileBackend::parse("Supabase"), Some(ProfileBackend::Supabase));
        assert_eq!(ProfileBackend::parse("data-server"), Some(ProfileBackend::DataServer));
        assert_eq!(ProfileBackend::parse("json-server"), Some(ProfileBackend::DataServer));
        assert_eq!(ProfileBackend::parse("sqlite"), None);
    }
}
