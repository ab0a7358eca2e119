//! List filters and their mirror in the URL query string.
//!
//! The URL is read once when the list view mounts; after that the in-memory
//! [`FilterState`] is authoritative and every change re-derives the query
//! string. Default values (empty, `全部`, page 1) never appear in the URL.

use url::form_urlencoded;

use crate::error::Error;
use crate::poetry::PoetryQuery;

/// Option label meaning "no filter"
pub const ALL: &str = "全部";

/// Dynasty choices offered by the list view
pub const DYNASTIES: [&str; 6] = [ALL, "唐代", "宋代", "元代", "明代", "清代"];

/// Author choices offered by the list view
pub const AUTHORS: [&str; 6] = [ALL, "李白", "杜甫", "苏轼", "李清照", "白居易"];

/// Dynasty fixed by a list route, if the route has one
pub fn route_dynasty(path: &str) -> Option<&'static str> {
    match path.trim_end_matches('/') {
        "/tang-poetry" => Some("唐代"),
        "/song-poetry" => Some("宋代"),
        "/yuan-qu" => Some("元代"),
        _ => None,
    }
}

fn normalize(value: &str) -> String {
    let value = value.trim();
    if value == ALL {
        String::new()
    } else {
        value.to_string()
    }
}

fn parse_page(value: &str) -> u32 {
    value.trim().parse::<u32>().ok().filter(|p| *p > 0).unwrap_or(1)
}

/// The four list filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoetryFilter {
    pub search: String,
    pub dynasty: String,
    pub author: String,
    pub page: u32,
}

impl Default for PoetryFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            dynasty: String::new(),
            author: String::new(),
            page: 1,
        }
    }
}

/// Filter state of one list view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    filter: PoetryFilter,
    locked_dynasty: Option<String>,
}

impl FilterState {
    /// Initial state from a query string (with or without the leading `?`)
    /// and an optional dynasty taken from the route.
    ///
    /// A route dynasty wins over the `dynasty` parameter and locks the
    /// dynasty filter for the lifetime of this state.
    pub fn from_query(query: &str, route_dynasty: Option<&str>) -> Self {
        let mut filter = PoetryFilter::default();

        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "search" => filter.search = value.trim().to_string(),
                "dynasty" => filter.dynasty = normalize(&value),
                "author" => filter.author = normalize(&value),
                "page" => filter.page = parse_page(&value),
                _ => {}
            }
        }

        let locked_dynasty = route_dynasty.map(normalize).filter(|d| !d.is_empty());
        if let Some(dynasty) = &locked_dynasty {
            filter.dynasty = dynasty.clone();
        }

        Self {
            filter,
            locked_dynasty,
        }
    }

    pub fn filter(&self) -> &PoetryFilter {
        &self.filter
    }

    pub fn page(&self) -> u32 {
        self.filter.page
    }

    /// Whether the dynasty control is disabled
    pub fn dynasty_locked(&self) -> bool {
        self.locked_dynasty.is_some()
    }

    /// Set the free-text term and go back to page 1
    pub fn set_search(&mut self, search: &str) {
        self.filter.search = search.trim().to_string();
        self.filter.page = 1;
    }

    /// Set the dynasty and go back to page 1.
    ///
    /// Fails with [`Error::DynastyLocked`] when the route fixes the dynasty.
    pub fn set_dynasty(&mut self, dynasty: &str) -> Result<(), Error> {
        if self.dynasty_locked() {
            return Err(Error::DynastyLocked);
        }
        self.filter.dynasty = normalize(dynasty);
        self.filter.page = 1;
        Ok(())
    }

    /// Set the author and go back to page 1
    pub fn set_author(&mut self, author: &str) {
        self.filter.author = normalize(author);
        self.filter.page = 1;
    }

    /// Move to `page`; other filters stay as they are. Zero is treated as 1.
    pub fn set_page(&mut self, page: u32) {
        self.filter.page = page.max(1);
    }

    /// Clear every filter the user controls
    pub fn reset(&mut self) {
        self.filter = PoetryFilter {
            dynasty: self.locked_dynasty.clone().unwrap_or_default(),
            ..PoetryFilter::default()
        };
    }

    /// Canonical query string for the address bar, without the leading `?`.
    ///
    /// A route-fixed dynasty is part of the path, so it stays out of the query.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if !self.filter.search.is_empty() {
            serializer.append_pair("search", &self.filter.search);
        }
        if !self.filter.dynasty.is_empty() && !self.dynasty_locked() {
            serializer.append_pair("dynasty", &self.filter.dynasty);
        }
        if !self.filter.author.is_empty() {
            serializer.append_pair("author", &self.filter.author);
        }
        if self.filter.page != 1 {
            serializer.append_pair("page", &self.filter.page.to_string());
        }
        serializer.finish()
    }

    /// The same filters as a remote store request
    pub fn to_remote_query(&self, page_size: u32) -> PoetryQuery {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        PoetryQuery {
            search: non_empty(&self.filter.search),
            dynasty: non_empty(&self.filter.dynasty),
            author: non_empty(&self.filter.author),
            page: self.filter.page,
            page_size,
        }
    }
}
