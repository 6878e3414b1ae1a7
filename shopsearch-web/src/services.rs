//! The outbound collaborators a search needs, built once at startup.

use std::sync::Arc;

use anyhow::{Context, Result};
use shopsearch_intent::{IntentError, IntentExtractor, OpenAiIntentExtractor};
use shopsearch_settings::Settings;
use shopsearch_store::{Product, ProductQuery, ProductStore, StoreError, SupabaseStore};
use thiserror::Error;

/// The intent extractor and product store, shared by every worker through
/// Actix's app_data. Neither is mutated after construction.
#[derive(Clone)]
pub struct SearchServices {
    /// Turns query text into an intent.
    extractor: Arc<dyn IntentExtractor>,
    /// Runs the product query.
    store: Arc<dyn ProductStore>,
    /// The table products are read from.
    table: String,
}

/// Any failure after a search request was accepted.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query could not be turned into an intent.
    #[error("Intent extraction failed: {0}")]
    Intent(#[from] IntentError),

    /// The product query failed.
    #[error("Product query failed: {0}")]
    Store(#[from] StoreError),
}

impl SearchServices {
    /// Bundle an extractor and a store that reads from `table`.
    pub fn new(
        extractor: Arc<dyn IntentExtractor>,
        store: Arc<dyn ProductStore>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            store,
            table: table.into(),
        }
    }

    /// Build the production services described by `settings`.
    ///
    /// # Errors
    /// If either client cannot be constructed from its settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let _setup_span = tracing::info_span!("search_services_setup").entered();

        let extractor = OpenAiIntentExtractor::new_boxed(&settings.intent)
            .context("Setting up the intent extractor")?;
        let store =
            SupabaseStore::new_boxed(&settings.store).context("Setting up the product store")?;

        tracing::info!(
            r#type = "web.configuring-services",
            extractor = %extractor.name(),
            store = %store.name(),
            "Set up search services"
        );

        Ok(Self::new(
            Arc::from(extractor as Box<dyn IntentExtractor>),
            Arc::from(store as Box<dyn ProductStore>),
            settings.store.table.clone(),
        ))
    }

    /// The operator-visible name of the extractor.
    pub fn extractor_name(&self) -> String {
        self.extractor.name()
    }

    /// The operator-visible name of the store.
    pub fn store_name(&self) -> String {
        self.store.name()
    }

    /// Extract the intent of `query`, then fetch the products matching it.
    ///
    /// The store is only consulted once extraction has fully succeeded.
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, SearchError> {
        let intent = self.extractor.extract(query).await?;
        tracing::debug!(
            r#type = "web.search.intent",
            product_type = %intent.product_type,
            budget = intent.budget,
            use_case = ?intent.use_case,
            style = ?intent.style,
            "Extracted search intent"
        );

        let product_query = ProductQuery::from_intent(&self.table, &intent);
        Ok(self.store.query(&product_query).await?)
    }
}
