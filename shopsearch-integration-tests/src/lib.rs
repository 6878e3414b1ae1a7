#![warn(missing_docs, clippy::missing_docs_in_private_items)]
// None of the tests are seen by the linter, so none of the utilities are marked
// as used. But docs don't generate for the below if they are `#[cfg(test)]`.
// This is a compromise.
#![allow(dead_code)]

//! Tests for Shopsearch that work by reading from the external API only.
//!
//! The paths, status codes and bodies used in tests here are the public API,
//! and clients depend on them, so they are checked exactly.
//!
//! This is structured as a separate crate so that it produces a single test
//! binary instead of one test per file like would happen if this were
//! `shopsearch/tests/...`. This improves compilation and test times.
//!
//! The primary tool used by tests is [`shopsearch_test`], which creates mock
//! servers for the completion API and the product database, starts the
//! application against them, and provides helpers to inspect the state of the
//! app. It then calls the test function that is passed to it, providing the
//! above tools as an argument.
//!
//! ```
//! use shopsearch_integration_tests::{shopsearch_test, TestingTools};
//! use reqwest::StatusCode;
//!
//! #[actix_rt::test]
//! async fn lbheartbeat_works() {
//!     shopsearch_test(
//!         |_| (),
//!         |TestingTools { test_client, .. }| async move {
//!             let response = test_client
//!                 .get("/__lbheartbeat__")
//!                 .send()
//!                 .await
//!                 .expect("failed to execute request");
//!
//!             assert_eq!(response.status(), StatusCode::OK);
//!         },
//!     )
//!     .await
//! }
//! ```

mod dockerflow;
mod logging;
mod search;
mod utils;

pub use crate::utils::{
    logging::{LogWatcher, TracingJsonEvent},
    mocks::{mock_completion, mock_products},
    test_tools::{shopsearch_test, TestReqwestClient, TestingTools},
};
