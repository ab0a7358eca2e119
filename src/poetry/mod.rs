//! Poems and the stores that serve them

mod json_server;
mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use json_server::JsonServerPoetry;
pub use supabase::SupabasePoetry;

/// Poem identifier
pub type PoemId = u64;

/// A poem as shown on the detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poem {
    pub id: PoemId,
    pub title: String,
    pub author: String,
    pub dynasty: String,
    pub content: String,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub likes: u64,
}

/// A poem as shown on list cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoemSummary {
    pub id: PoemId,
    pub title: String,
    pub author: String,
    pub dynasty: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub likes: u64,
}

/// A filtered page request against a poetry store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoetryQuery {
    /// Free-text term
    pub search: Option<String>,
    /// Exact dynasty
    pub dynasty: Option<String>,
    /// Exact author
    pub author: Option<String>,
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub page_size: u32,
}

impl PoetryQuery {
    /// Query parameters in the json-server dialect
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = &self.search {
            params.push(("q", search.clone()));
        }
        if let Some(dynasty) = &self.dynasty {
            params.push(("dynasty", dynasty.clone()));
        }
        if let Some(author) = &self.author {
            params.push(("author", author.clone()));
        }
        params.push(("_page", self.page.to_string()));
        params.push(("_limit", self.page_size.to_string()));
        params
    }

    /// Zero-based offset of the first row on this page
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// Read access to poems
#[async_trait]
pub trait PoetryStore: Send + Sync {
    /// One page of poems matching `query`
    async fn list(&self, query: &PoetryQuery) -> Result<Vec<PoemSummary>, Error>;

    /// A single poem, `None` when it does not exist
    async fn get_by_id(&self, id: PoemId) -> Result<Option<Poem>, Error>;

    /// All poems whose id is in `ids`
    async fn get_by_ids(&self, ids: &[PoemId]) -> Result<Vec<PoemSummary>, Error>;
}
