//! Tests the product search endpoint from the outside.
#![cfg(test)]

use crate::{mock_completion, mock_products, shopsearch_test, TestingTools};
use anyhow::Result;
use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

#[actix_rt::test]
async fn search_returns_matching_products() -> Result<()> {
    shopsearch_test(
        |_| (),
        |TestingTools {
             test_client,
             intent_mock,
             store_mock,
             ..
         }| async move {
            let completion = intent_mock
                .mock_async(|when, then| {
                    when.method(POST)
                        .path("/v1/chat/completions")
                        .header("authorization", "Bearer test-openai-key")
                        .body_contains("\"role\":\"system\"")
                        .body_contains("laptop gaming max 1500");
                    then.status(200).json_body(json!({
                        "choices": [{
                            "message": {
                                "role": "assistant",
                                "content": r#"{"product_type": "laptop", "use_case": ["gaming"], "budget": 1500}"#
                            }
                        }]
                    }));
                })
                .await;
            let rows = json!([
                {"id": 1, "name": "ROG Strix G15", "tags": ["laptop"], "price": 1450, "use_case": ["gaming"]},
                {"id": 2, "name": "Nitro 5", "tags": ["laptop", "acer"], "price": 1099.5, "use_case": ["gaming", "work"]}
            ]);
            let products = store_mock
                .mock_async(|when, then| {
                    when.method(GET)
                        .path("/rest/v1/products")
                        .header("apikey", "test-supabase-key")
                        .query_param("select", "*")
                        .query_param("tags", "cs.{laptop}")
                        .query_param("price", "lte.1500")
                        .query_param("use_case", "cs.{gaming}");
                    then.status(200).json_body(rows.clone());
                })
                .await;

            let response = test_client
                .post("/api/search")
                .json(&json!({"query": "laptop gaming max 1500"}))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::OK);
            let body: Value = response.json().await?;
            assert_eq!(body, json!({ "results": rows }));
            completion.assert_async().await;
            products.assert_async().await;

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn search_without_use_case_sends_two_filters() -> Result<()> {
    shopsearch_test(
        |_| (),
        |TestingTools {
             test_client,
             intent_mock,
             store_mock,
             ..
         }| async move {
            mock_completion(
                &intent_mock,
                r#"{"product_type": "headset", "use_case": [], "budget": 500000}"#,
            )
            .await;
            let products = store_mock
                .mock_async(|when, then| {
                    when.method(GET)
                        .path("/rest/v1/products")
                        .query_param("tags", "cs.{headset}")
                        .query_param("price", "lte.500000")
                        .query_param_exists("select")
                        .matches(|request| {
                            !request
                                .query_params
                                .as_ref()
                                .map_or(false, |params| {
                                    params.iter().any(|(name, _)| name == "use_case")
                                })
                        });
                    then.status(200).json_body(json!([]));
                })
                .await;

            let response = test_client
                .post("/api/search")
                .json(&json!({"query": "headset murah"}))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.json::<Value>().await?, json!({"results": []}));
            products.assert_async().await;

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn non_post_methods_are_rejected() -> Result<()> {
    shopsearch_test(
        |_| (),
        |TestingTools {
             test_client,
             intent_mock,
             store_mock,
             ..
         }| async move {
            let completion = mock_completion(&intent_mock, "{}").await;
            let products = mock_products(&store_mock, json!([])).await;

            for method in [Method::GET, Method::PUT, Method::DELETE] {
                let response = test_client.request(method, "/api/search").send().await?;
                assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
                assert_eq!(
                    response.json::<Value>().await?,
                    json!({"message": "Only POST requests allowed"})
                );
            }

            assert_eq!(completion.hits_async().await, 0);
            assert_eq!(products.hits_async().await, 0);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn missing_query_is_rejected() -> Result<()> {
    shopsearch_test(
        |_| (),
        |TestingTools {
             test_client,
             intent_mock,
             store_mock,
             ..
         }| async move {
            let completion = mock_completion(&intent_mock, "{}").await;
            let products = mock_products(&store_mock, json!([])).await;

            for body in [json!({}), json!({"query": ""})] {
                let response = test_client.post("/api/search").json(&body).send().await?;
                assert_eq!(response.status(), StatusCode::BAD_REQUEST);
                assert_eq!(
                    response.json::<Value>().await?,
                    json!({"error": "Missing query"})
                );
            }

            assert_eq!(completion.hits_async().await, 0);
            assert_eq!(products.hits_async().await, 0);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn non_json_completion_fails_without_querying_the_store() -> Result<()> {
    shopsearch_test(
        |_| (),
        |TestingTools {
             test_client,
             intent_mock,
             store_mock,
             ..
         }| async move {
            let completion = mock_completion(
                &intent_mock,
                "Tentu! Berikut hasilnya: product_type=laptop, budget=1500",
            )
            .await;
            let products = mock_products(&store_mock, json!([])).await;

            let response = test_client
                .post("/api/search")
                .json(&json!({"query": "laptop"}))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                response.json::<Value>().await?,
                json!({"error": "Failed to process query"})
            );
            assert_eq!(completion.hits_async().await, 1);
            assert_eq!(products.hits_async().await, 0);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn completion_api_failure_is_an_internal_error() -> Result<()> {
    shopsearch_test(
        |_| (),
        |TestingTools {
             test_client,
             intent_mock,
             store_mock,
             ..
         }| async move {
            intent_mock
                .mock_async(|when, then| {
                    when.method(POST).path("/v1/chat/completions");
                    then.status(401).json_body(json!({
                        "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
                    }));
                })
                .await;
            let products = mock_products(&store_mock, json!([])).await;

            let response = test_client
                .post("/api/search")
                .json(&json!({"query": "laptop"}))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body = response.text().await?;
            assert_eq!(body, r#"{"error":"Failed to process query"}"#);
            assert_eq!(products.hits_async().await, 0);
            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn store_errors_are_not_exposed() -> Result<()> {
    shopsearch_test(
        |_| (),
        |TestingTools {
             test_client,
             intent_mock,
             store_mock,
             ..
         }| async move {
            mock_completion(
                &intent_mock,
                r#"{"product_type": "laptop", "budget": 1500}"#,
            )
            .await;
            store_mock
                .mock_async(|when, then| {
                    when.method(GET).path("/rest/v1/products");
                    then.status(404).json_body(json!({
                        "code": "42P01",
                        "details": null,
                        "hint": null,
                        "message": "relation \"public.products\" does not exist"
                    }));
                })
                .await;

            let response = test_client
                .post("/api/search")
                .json(&json!({"query": "laptop"}))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body = response.text().await?;
            assert_eq!(body, r#"{"error":"Failed to process query"}"#);
            assert!(!body.contains("42P01"));
            Ok(())
        },
    )
    .await
}
