#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! Extraction of structured search intent from free-text shopper queries.
//!
//! The heavy lifting is done by a language model behind a chat completion API.
//! This crate sends the query, then decodes the completion text into an
//! [`Intent`]. It does not validate the intent beyond that typed decode.

mod fixed;
mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::fixed::FixedIntentExtractor;
pub use crate::openai::OpenAiIntentExtractor;

/// The filter criteria a language model extracted from a shopper's query.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    /// The kind of product wanted, matched against product tags.
    pub product_type: String,

    /// What the product will be used for. Absent, `null` and empty all mean
    /// "no preference".
    #[serde(default)]
    pub use_case: Option<Vec<String>>,

    /// The maximum price the shopper will pay.
    pub budget: f64,

    /// A free-form style preference. Extracted but not used for filtering.
    #[serde(default)]
    pub style: Option<String>,
}

impl Intent {
    /// Decode the text of a completion into an intent.
    ///
    /// # Errors
    /// If the text is not JSON, or if `product_type` or `budget` is missing or
    /// of the wrong type.
    pub fn from_completion(text: &str) -> Result<Self, IntentError> {
        serde_json::from_str(text).map_err(IntentError::Decode)
    }

    /// The requested use cases, if there are any.
    pub fn use_cases(&self) -> Option<&[String]> {
        self.use_case.as_deref().filter(|cases| !cases.is_empty())
    }
}

/// Something that can turn a shopper's query into an [`Intent`].
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    /// An operator-visible name for this extractor.
    fn name(&self) -> String;

    /// Extract the search intent expressed by `query`.
    async fn extract(&self, query: &str) -> Result<Intent, IntentError>;
}

/// Errors that may occur while setting up an extractor.
#[derive(Debug, Error)]
#[allow(missing_docs, clippy::missing_docs_in_private_items)]
pub enum SetupError {
    #[error("The intent extractor cannot be used with the current configuration")]
    InvalidConfiguration(#[source] anyhow::Error),

    #[error("There was a network error while setting up the intent extractor")]
    Network(#[source] anyhow::Error),
}

/// Errors that may occur while extracting intent.
#[derive(Debug, Error)]
#[allow(missing_docs, clippy::missing_docs_in_private_items)]
pub enum IntentError {
    #[error("There was a network error while extracting intent: {0}")]
    Network(#[source] reqwest::Error),

    #[error("The completion API responded with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("The completion API returned no completion text")]
    EmptyCompletion,

    #[error("The completion could not be decoded as a search intent: {0}")]
    Decode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::{Intent, IntentError};
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_full_intent() {
        let intent = Intent::from_completion(
            r#"{"product_type": "laptop", "use_case": ["gaming", "work"], "budget": 15000000, "style": "slim"}"#,
        )
        .expect("valid intent");

        assert_eq!(
            intent,
            Intent {
                product_type: "laptop".to_string(),
                use_case: Some(vec!["gaming".to_string(), "work".to_string()]),
                budget: 15_000_000.0,
                style: Some("slim".to_string()),
            }
        );
    }

    #[test]
    fn optional_fields_may_be_missing_or_null() {
        let intent = Intent::from_completion(r#"{"product_type": "mouse", "budget": 300000}"#)
            .expect("valid intent");
        assert_eq!(intent.use_case, None);
        assert_eq!(intent.style, None);

        let intent = Intent::from_completion(
            r#"{"product_type": "mouse", "use_case": null, "budget": 300000, "style": null}"#,
        )
        .expect("valid intent");
        assert_eq!(intent.use_case, None);
    }

    #[test]
    fn empty_use_case_means_no_preference() {
        let intent =
            Intent::from_completion(r#"{"product_type": "phone", "use_case": [], "budget": 5}"#)
                .expect("valid intent");
        assert_eq!(intent.use_cases(), None);
    }

    #[test]
    fn non_json_completion_is_an_error() {
        let result = Intent::from_completion("Sure! Here is the JSON you asked for.");
        assert!(matches!(result, Err(IntentError::Decode(_))));
    }

    #[test]
    fn missing_required_fields_are_an_error() {
        assert!(matches!(
            Intent::from_completion(r#"{"product_type": "laptop"}"#),
            Err(IntentError::Decode(_))
        ));
        assert!(matches!(
            Intent::from_completion(r#"{"budget": 1500}"#),
            Err(IntentError::Decode(_))
        ));
        assert!(matches!(
            Intent::from_completion(r#"{"product_type": "laptop", "budget": "cheap"}"#),
            Err(IntentError::Decode(_))
        ));
    }
}
