//! Poems in the provider's `poetry` table

use async_trait::async_trait;
use std::sync::Arc;

use super::{Poem, PoemId, PoemSummary, PoetryQuery, PoetryStore};
use crate::auth::Auth;
use crate::error::Error;
use crate::postgrest::PostgrestClient;

/// Poetry store backed by PostgREST
pub struct SupabasePoetry {
    table: PostgrestClient,
    auth: Option<Arc<Auth>>,
}

impl SupabasePoetry {
    pub fn new(table: PostgrestClient, auth: Option<Arc<Auth>>) -> Self {
        Self { table, auth }
    }

    fn client(&self) -> PostgrestClient {
        let token = self.auth.as_ref().and_then(|auth| auth.access_token());
        self.table.clone().with_auth(token)
    }
}

/// PostgREST reserves `,` `(` `)` inside `or=(...)`.
fn search_pattern(term: &str) -> String {
    let cleaned: String = term
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')'))
        .collect();
    format!("*{}*", cleaned)
}

#[async_trait]
impl PoetryStore for SupabasePoetry {
    async fn list(&self, query: &PoetryQuery) -> Result<Vec<PoemSummary>, Error> {
        let client = self.client();
        let mut select = client.select("id,title,author,dynasty,content,likes");

        if let Some(search) = &query.search {
            let pattern = search_pattern(search);
            select.or(&format!(
                "title.ilike.{p},content.ilike.{p}",
                p = pattern
            ));
        }
        if let Some(dynasty) = &query.dynasty {
            select.eq("dynasty", dynasty);
        }
        if let Some(author) = &query.author {
            select.eq("author", author);
        }
        select
            .order("id", true)
            .limit(query.page_size)
            .offset(query.offset());

        select.execute::<PoemSummary>().await
    }

    async fn get_by_id(&self, id: PoemId) -> Result<Option<Poem>, Error> {
        self.client()
            .select("*")
            .eq("id", id)
            .execute_one::<Poem>()
            .await
    }

    async fn get_by_ids(&self, ids: &[PoemId]) -> Result<Vec<PoemSummary>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.client()
            .select("*")
            .in_list("id", ids)
            .execute::<PoemSummary>()
            .await
    }
}
