#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! Product lookups against a hosted PostgREST database.
//!
//! A [`ProductQuery`] is a conjunction of [`Filter`]s built from an [`Intent`].
//! A [`ProductStore`] executes it and returns the matching rows untouched.

mod memory;
mod query;
mod supabase;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub use crate::memory::MemoryStore;
pub use crate::query::{Filter, ProductQuery};
pub use crate::supabase::SupabaseStore;
pub use shopsearch_intent::Intent;

/// A product row, exactly as the store returned it.
pub type Product = Value;

/// A backend that can run product queries.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// An operator-visible name for this store.
    fn name(&self) -> String;

    /// Return every row matching all of the filters in `query`.
    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError>;
}

/// Errors that may occur while setting up a store.
#[derive(Debug, Error)]
#[allow(missing_docs, clippy::missing_docs_in_private_items)]
pub enum SetupError {
    #[error("The product store cannot be used with the current configuration")]
    InvalidConfiguration(#[source] anyhow::Error),

    #[error("There was a network error while setting up the product store")]
    Network(#[source] anyhow::Error),
}

/// Errors that may occur while querying the store.
#[derive(Debug, Error)]
#[allow(missing_docs, clippy::missing_docs_in_private_items)]
pub enum StoreError {
    #[error("There was a network error while querying the store: {0}")]
    Network(#[source] reqwest::Error),

    #[error("The store rejected the query with status {status}: {error}")]
    Query { status: u16, error: PostgrestError },

    #[error("The store response could not be decoded: {0}")]
    Decode(#[source] anyhow::Error),
}

/// The error body PostgREST sends with non-success responses.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PostgrestError {
    /// A PostgreSQL or PostgREST error code, such as `22P02`.
    #[serde(default)]
    pub code: Option<String>,

    /// Human readable description of the error.
    pub message: String,

    /// Additional detail, if any.
    #[serde(default)]
    pub details: Option<String>,

    /// A suggestion to fix the error, if any.
    #[serde(default)]
    pub hint: Option<String>,
}

impl fmt::Display for PostgrestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "[{}] ", code)?;
        }
        f.write_str(&self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}
