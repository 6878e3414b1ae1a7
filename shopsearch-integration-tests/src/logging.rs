//! Tests that Shopsearch logs behave as expected.
//!
//! Request handling happens on the server's worker threads, which do not
//! report to the per-test log watcher, so only events from the test's own
//! thread can be checked here. The per-request logs are checked by the unit
//! tests in `shopsearch-web`.
#![cfg(test)]

use crate::{shopsearch_test, TestingTools};
use tracing::Level;

#[actix_rt::test]
async fn startup_logs_the_configured_services() {
    shopsearch_test(
        |_| (),
        |TestingTools {
             mut log_watcher, ..
         }| async move {
            assert!(log_watcher.has(|event| {
                event.level == Level::INFO
                    && event.field_contains("type", "web.configuring-services")
                    && event.field_contains("extractor", "OpenAiIntentExtractor(gpt-4)")
                    && event.field_contains("store", "SupabaseStore")
            }));
        },
    )
    .await
}

#[actix_rt::test]
async fn credentials_are_not_logged() {
    shopsearch_test(
        |_| (),
        |TestingTools {
             mut log_watcher, ..
         }| async move {
            assert!(log_watcher.events().count() > 0);
            assert!(!log_watcher.has(|event| {
                event
                    .fields
                    .values()
                    .any(|value| value.to_string().contains("test-openai-key"))
            }));
        },
    )
    .await
}
