//! A store holding a fixed set of rows in memory.
//!
//! It is meant to be used in development and testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::{PostgrestError, Product, ProductQuery, ProductStore, StoreError};

/// Evaluates queries against an in-memory list of rows, and remembers every
/// query it was given.
pub struct MemoryStore {
    /// All rows, in the order they are returned.
    rows: Vec<Product>,
    /// When set, every query fails with this error instead.
    failure: Option<PostgrestError>,
    /// Queries received so far.
    received: Arc<Mutex<Vec<ProductQuery>>>,
}

impl MemoryStore {
    /// A store containing `rows`.
    pub fn new(rows: Vec<Product>) -> Self {
        Self {
            rows,
            failure: None,
            received: Arc::default(),
        }
    }

    /// A store that rejects every query with `error`, like a database
    /// reporting a failure.
    pub fn failing(error: PostgrestError) -> Self {
        Self {
            rows: Vec::new(),
            failure: Some(error),
            received: Arc::default(),
        }
    }

    /// A handle to the queries received so far.
    pub fn received(&self) -> Arc<Mutex<Vec<ProductQuery>>> {
        Arc::clone(&self.received)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    fn name(&self) -> String {
        format!("MemoryStore({} rows)", self.rows.len())
    }

    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        if let Ok(mut received) = self.received.lock() {
            received.push(query.clone());
        }

        if let Some(error) = &self.failure {
            return Err(StoreError::Query {
                status: 400,
                error: error.clone(),
            });
        }

        Ok(self
            .rows
            .iter()
            .filter(|row| query.matches(row))
            .cloned()
            .collect())
    }
}
