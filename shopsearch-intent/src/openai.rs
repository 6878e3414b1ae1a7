//! An intent extractor backed by an OpenAI compatible chat completion API.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use shopsearch_settings::IntentSettings;

use crate::{Intent, IntentError, IntentExtractor, SetupError};

/// Asks a chat model to extract the intent of a query.
///
/// Each extraction is a single, non-streaming request made of two messages:
/// the configured system instruction and the shopper's raw query.
pub struct OpenAiIntentExtractor {
    /// Client with the bearer token installed as a default header.
    client: reqwest::Client,
    /// The full URL of the chat completions endpoint.
    endpoint: String,
    /// The model identifier sent with each request.
    model: String,
    /// The instruction sent ahead of every query.
    system_prompt: String,
}

/// Body of a chat completion request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    /// Model identifier.
    model: &'a str,
    /// The conversation, oldest message first.
    messages: [ChatMessage<'a>; 2],
}

/// One message of a chat completion request.
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    /// `system` or `user`.
    role: &'static str,
    /// The message text.
    content: &'a str,
}

/// The parts of a chat completion response this crate reads.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// The completions generated. Only the first is used.
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::missing_docs_in_private_items)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::missing_docs_in_private_items)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiIntentExtractor {
    /// Create an extractor from settings.
    ///
    /// # Errors
    /// If the API key cannot be used as a header value, or if the HTTP client
    /// cannot be built.
    pub fn new_boxed(settings: &IntentSettings) -> Result<Box<Self>, SetupError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
            .context("API key is not a valid header value")
            .map_err(SetupError::InvalidConfiguration)?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .context("Unable to create the Reqwest client")
            .map_err(SetupError::Network)?;

        Ok(Box::new(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            system_prompt: settings.system_prompt.clone(),
        }))
    }

    /// Request a completion for `query` and return its text.
    async fn complete(&self, query: &str) -> Result<String, IntentError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
        };

        tracing::debug!(r#type = "intent.openai.request", model = %self.model, "Requesting completion");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(IntentError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntentError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = response.json().await.map_err(IntentError::Network)?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(IntentError::EmptyCompletion)
    }
}

#[async_trait]
impl IntentExtractor for OpenAiIntentExtractor {
    fn name(&self) -> String {
        format!("OpenAiIntentExtractor({})", self.model)
    }

    async fn extract(&self, query: &str) -> Result<Intent, IntentError> {
        let completion = self.complete(query).await?;
        Intent::from_completion(&completion)
    }
}
