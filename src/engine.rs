// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::node::Composite;
use crate::utils::path::validate_query_path;

/// Evaluates an ordered set of named query paths against result roots.
///
/// Each evaluation produces one [`QueryResults`] row with a JSON value per
/// query, in the order the queries were added.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    queries: Vec<Query>,
}

#[derive(Debug, Clone)]
struct Query {
    name: String,
    path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub name: String,
    pub path: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResults {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub result: Vec<QueryResult>,
}

impl QueryResults {
    /// Value of the query with the given name.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.result.iter().find(|r| r.name == name).map(|r| &r.value)
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named query. Names must be unique within the engine.
    pub fn add_query(&mut self, name: String, path: String) -> Result<()> {
        if name.trim().is_empty() {
            bail!("query name is empty");
        }
        if self.queries.iter().any(|q| q.name == name) {
            bail!("query '{name}' already exists");
        }
        validate_query_path(&path)?;
        self.queries.push(Query { name, path });
        Ok(())
    }

    /// Names of the queries, in evaluation order.
    pub fn query_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.queries.iter().map(|q| q.name.as_str())
    }

    pub fn clear_queries(&mut self) {
        self.queries.clear();
    }

    /// Resolve a single path and materialize it as JSON.
    pub fn eval_query(&self, root: &Composite, path: &str) -> Result<serde_json::Value> {
        Ok(root.resolve(path)?.into_json()?)
    }

    /// Evaluate every query against `root`.
    pub fn eval(&self, root: &Composite) -> Result<QueryResults> {
        let _span = tracing::debug_span!(
            "eval",
            type_name = root.type_name(),
            queries = self.queries.len()
        )
        .entered();

        let mut results = QueryResults::default();
        for query in &self.queries {
            let value = self
                .eval_query(root, &query.path)
                .with_context(|| format!("query '{}' failed", query.name))?;
            results.result.push(QueryResult {
                name: query.name.clone(),
                path: query.path.clone(),
                value,
            });
        }
        Ok(results)
    }

    /// Evaluate every query against each root, producing one row per root.
    pub fn eval_many(&self, roots: &[Composite]) -> Result<Vec<QueryResults>> {
        roots.iter().map(|root| self.eval(root)).collect()
    }
}
