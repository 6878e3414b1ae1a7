//! A product store backed by Supabase's PostgREST API.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use shopsearch_settings::StoreSettings;

use crate::{PostgrestError, Product, ProductQuery, ProductStore, SetupError, StoreError};

/// Runs product queries through `{url}/rest/v1/{table}`.
pub struct SupabaseStore {
    /// Client with the access key installed as default headers.
    client: reqwest::Client,
    /// The REST root, such as `https://xyz.supabase.co/rest/v1`.
    rest_url: String,
}

impl SupabaseStore {
    /// Create a store from settings.
    ///
    /// # Errors
    /// If the access key cannot be used as a header value, or if the HTTP
    /// client cannot be built.
    pub fn new_boxed(settings: &StoreSettings) -> Result<Box<Self>, SetupError> {
        let header = |value: String| {
            let mut value = HeaderValue::from_str(&value)
                .context("access key is not a valid header value")
                .map_err(SetupError::InvalidConfiguration)?;
            value.set_sensitive(true);
            Ok::<_, SetupError>(value)
        };

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header(settings.api_key.clone())?);
        headers.insert(AUTHORIZATION, header(format!("Bearer {}", settings.api_key))?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .context("Unable to create the Reqwest client")
            .map_err(SetupError::Network)?;

        Ok(Box::new(Self {
            client,
            rest_url: format!("{}/rest/v1", settings.url.trim_end_matches('/')),
        }))
    }
}

#[async_trait]
impl ProductStore for SupabaseStore {
    fn name(&self) -> String {
        "SupabaseStore".to_string()
    }

    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let url = format!("{}/{}", self.rest_url, query.table);
        let params = query.to_query_pairs();
        tracing::debug!(r#type = "store.supabase.query", %url, ?params, "Querying products");

        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(StoreError::Network)?;

        let status = response.status();
        let body = response.bytes().await.map_err(StoreError::Network)?;

        if !status.is_success() {
            let error = serde_json::from_slice::<PostgrestError>(&body).unwrap_or_else(|_| {
                PostgrestError {
                    message: String::from_utf8_lossy(&body).into_owned(),
                    ..Default::default()
                }
            });
            return Err(StoreError::Query {
                status: status.as_u16(),
                error,
            });
        }

        serde_json::from_slice(&body)
            .map_err(|e| StoreError::Decode(anyhow!("expected a JSON array of rows: {}", e)))
    }
}
