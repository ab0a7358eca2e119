//! Poetry list page: filters, URL mirror and the current page of results

use log::{debug, error};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Error;
use crate::filter::{route_dynasty, FilterState, PoetryFilter};
use crate::poetry::{PoemSummary, PoetryStore};
use crate::view::ViewScope;

/// What the list page renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot {
    pub filter: PoetryFilter,
    pub dynasty_locked: bool,
    /// Path and query currently in the address bar
    pub location: String,
    pub poems: Vec<PoemSummary>,
    pub loading: bool,
}

struct ListState {
    filters: FilterState,
    location: String,
    poems: Vec<PoemSummary>,
    loading: bool,
}

/// Controller of one mounted poetry list page
pub struct PoetryListView {
    store: Arc<dyn PoetryStore>,
    page_size: u32,
    path: String,
    scope: ViewScope,
    state: Mutex<ListState>,
}

fn location(path: &str, filters: &FilterState) -> String {
    let query = filters.to_query_string();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

impl PoetryListView {
    /// Mount the list at `path` with the address bar's `query`
    pub fn mount(store: Arc<dyn PoetryStore>, page_size: u32, path: &str, query: &str) -> Self {
        let filters = FilterState::from_query(query, route_dynasty(path));
        let location = location(path, &filters);
        Self {
            store,
            page_size,
            path: path.to_string(),
            scope: ViewScope::new(),
            state: Mutex::new(ListState {
                filters,
                location,
                poems: Vec::new(),
                loading: false,
            }),
        }
    }

    pub async fn snapshot(&self) -> ListSnapshot {
        let state = self.state.lock().await;
        ListSnapshot {
            filter: state.filters.filter().clone(),
            dynasty_locked: state.filters.dynasty_locked(),
            location: state.location.clone(),
            poems: state.poems.clone(),
            loading: state.loading,
        }
    }

    /// Fetch the page for the current filters.
    ///
    /// Returns whether the response was applied; it is dropped when the view
    /// was unmounted or a newer fetch started meanwhile.
    pub async fn load(&self) -> bool {
        self.change(|_| Ok(())).await.unwrap_or(false)
    }

    /// Search for `text`, back on page 1
    pub async fn search(&self, text: &str) -> bool {
        self.change(|f| {
            f.set_search(text);
            Ok(())
        })
        .await
        .unwrap_or(false)
    }

    /// Filter by dynasty, back on page 1. `全部` or empty clears the filter.
    pub async fn set_dynasty(&self, dynasty: &str) -> Result<bool, Error> {
        self.change(|f| f.set_dynasty(dynasty)).await
    }

    /// Filter by author, back on page 1
    pub async fn set_author(&self, author: &str) -> bool {
        self.change(|f| {
            f.set_author(author);
            Ok(())
        })
        .await
        .unwrap_or(false)
    }

    /// Go to `page`
    pub async fn set_page(&self, page: u32) -> bool {
        self.change(|f| {
            f.set_page(page);
            Ok(())
        })
        .await
        .unwrap_or(false)
    }

    /// Drop every filter and the query string at once
    pub async fn reset(&self) -> bool {
        self.change(|f| {
            f.reset();
            Ok(())
        })
        .await
        .unwrap_or(false)
    }

    /// Tear the view down; in-flight responses are discarded
    pub fn unmount(&self) {
        self.scope.unmount();
    }

    async fn change<F>(&self, mutate: F) -> Result<bool, Error>
    where
        F: FnOnce(&mut FilterState) -> Result<(), Error>,
    {
        let (ticket, query) = {
            let mut state = self.state.lock().await;
            mutate(&mut state.filters)?;
            state.location = location(&self.path, &state.filters);
            state.loading = true;
            (self.scope.begin(), state.filters.to_remote_query(self.page_size))
        };

        debug!("Fetching poetry list {:?}", query);
        let poems = match self.store.list(&query).await {
            Ok(poems) => poems,
            Err(e) => {
                error!("Error fetching poetry data: {}", e);
                Vec::new()
            }
        };

        let mut state = self.state.lock().await;
        if !self.scope.is_current(ticket) {
            debug!("Dropping poetry list response for page {}", query.page);
            return Ok(false);
        }
        state.poems = poems;
        state.loading = false;
        Ok(true)
    }
}
