//! An extractor that ignores the query and returns a preset intent.
//!
//! It is meant to be used in development and testing.

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{Intent, IntentError, IntentExtractor};

/// What a [`FixedIntentExtractor`] hands back.
enum Outcome {
    /// Succeed with this intent.
    Intent(Intent),
    /// Decode this text as if a model had produced it.
    Completion(String),
}

/// Returns the same result for every query, and counts how often it was asked.
pub struct FixedIntentExtractor {
    /// The preset result.
    outcome: Outcome,
    /// Number of calls to `extract` so far. Shared with clones of the handle
    /// returned by [`Self::calls`].
    calls: Arc<AtomicUsize>,
}

impl FixedIntentExtractor {
    /// Always extract `intent`.
    pub fn new(intent: Intent) -> Self {
        Self {
            outcome: Outcome::Intent(intent),
            calls: Arc::default(),
        }
    }

    /// Decode `text` on every call, as though a model had returned it.
    pub fn from_completion<S: Into<String>>(text: S) -> Self {
        Self {
            outcome: Outcome::Completion(text.into()),
            calls: Arc::default(),
        }
    }

    /// A handle to the number of extractions performed so far.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl IntentExtractor for FixedIntentExtractor {
    fn name(&self) -> String {
        "FixedIntentExtractor".to_string()
    }

    async fn extract(&self, _query: &str) -> Result<Intent, IntentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Intent(intent) => Ok(intent.clone()),
            Outcome::Completion(text) => Intent::from_completion(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FixedIntentExtractor;
    use crate::{Intent, IntentError, IntentExtractor};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn counts_calls() {
        let extractor = FixedIntentExtractor::new(Intent {
            product_type: "monitor".to_string(),
            use_case: None,
            budget: 2_000_000.0,
            style: None,
        });
        let calls = extractor.calls();

        let intent = extractor.extract("monitor murah").await.unwrap();
        extractor.extract("monitor murah").await.unwrap();

        assert_eq!(intent.product_type, "monitor");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn completion_text_is_decoded() {
        let extractor = FixedIntentExtractor::from_completion("not json");
        assert!(matches!(
            extractor.extract("anything").await,
            Err(IntentError::Decode(_))
        ));
    }
}
