//! Canned upstream responses for the mock completion API and database.

use httpmock::{prelude::*, Mock, MockServer};
use serde_json::{json, Value};

/// Make the mock completion API answer every chat request with `content` as
/// the text of its only choice.
pub async fn mock_completion<'a>(server: &'a MockServer, content: &str) -> Mock<'a> {
    let body = json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    });
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(body);
        })
        .await
}

/// Make the mock database answer every product query with `rows`.
pub async fn mock_products(server: &MockServer, rows: Value) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/products");
            then.status(200).json_body(rows);
        })
        .await
}
