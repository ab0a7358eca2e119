//! Query builders for PostgrestClient

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};
use crate::postgrest::filter::FilterOperator;
use crate::postgrest::types::ReturnOption;

/// Connection details shared by every builder
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub(crate) url: String,
    pub(crate) key: String,
    pub(crate) client: Client,
    pub(crate) timeout: Option<Duration>,
    pub(crate) token: Option<String>,
}

impl Target {
    fn apply<'a>(&self, builder: FetchBuilder<'a>) -> FetchBuilder<'a> {
        builder
            .header("apikey", &self.key)
            .bearer_auth(self.token.as_deref().unwrap_or(&self.key))
            .timeout(self.timeout)
    }
}

/// Base query builder
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    /// Query parameters, in insertion order
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter to the query, replacing an earlier one with the same key
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.retain(|(k, _)| k != key);
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Add a filter on `column`
    pub fn add_filter(&mut self, column: &str, op: FilterOperator, value: &str) {
        self.add_param(column, &op.expr(value));
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    target: Target,
    query: QueryBuilder,
}

impl SelectBuilder {
    pub(crate) fn new(target: Target, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);
        Self { target, query }
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(&mut self, column: &str, value: T) -> &mut Self {
        self.query
            .add_filter(column, FilterOperator::Eq, &value.to_string());
        self
    }

    /// Filter rows where column is in a list of values
    pub fn in_list<T: ToString>(&mut self, column: &str, values: &[T]) -> &mut Self {
        let values_str: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.query
            .add_filter(column, FilterOperator::In, &values_str.join(","));
        self
    }

    /// Limit the number of rows returned
    pub fn limit(&mut self, count: u32) -> &mut Self {
        self.query.add_param("limit", &count.to_string());
        self
    }

    /// Match rows satisfying any of the comma separated filters
    pub fn or(&mut self, filters: &str) -> &mut Self {
        self.query.add_param("or", &format!("({})", filters));
        self
    }

    /// Skip a number of rows
    pub fn offset(&mut self, count: u32) -> &mut Self {
        self.query.add_param("offset", &count.to_string());
        self
    }

    /// Order the results by a column
    pub fn order(&mut self, column: &str, ascending: bool) -> &mut Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.query
            .add_param("order", &format!("{}.{}", column, direction));
        self
    }

    /// Current query parameters
    pub fn params(&self) -> &[(String, String)] {
        self.query.get_params()
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        let fetch = self
            .target
            .apply(Fetch::get(&self.target.client, &self.target.url))
            .query(self.query.get_params().iter().cloned());

        fetch.execute::<Vec<T>>().await
    }

    /// Execute the query and return the first row
    pub async fn execute_one<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        self.limit(1);

        let results = self.execute::<T>().await?;
        Ok(results.into_iter().next())
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    target: Target,
    values: T,
    query: QueryBuilder,
    returning: ReturnOption,
}

impl<T: Serialize> UpdateBuilder<T> {
    pub(crate) fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            query: QueryBuilder::new(),
            returning: ReturnOption::Minimal,
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query
            .add_filter(column, FilterOperator::Eq, &value.to_string());
        self
    }

    /// Choose what the server sends back
    pub fn returning(&mut self, option: ReturnOption) -> &mut Self {
        self.returning = option;
        self
    }

    fn fetch(&self) -> Result<FetchBuilder<'_>, Error> {
        self.target
            .apply(Fetch::patch(&self.target.client, &self.target.url))
            .header("Prefer", self.returning.as_prefer())
            .query(self.query.get_params().iter().cloned())
            .json(&self.values)
    }

    /// Execute the update and return the updated rows
    pub async fn execute<R: DeserializeOwned>(&mut self) -> Result<Vec<R>, Error> {
        self.returning(ReturnOption::Representation);
        self.fetch()?.execute::<Vec<R>>().await
    }

    /// Execute the update without returning the updated data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        self.fetch()?.execute_empty().await
    }
}
