//! Web handlers for the product search API.

use actix_web::{
    web::{self, Bytes, Data, ServiceConfig},
    HttpMessage, HttpRequest, HttpResponse,
};
use serde::Serialize;
use serde_json::Value;
use shopsearch_settings::Settings;
use shopsearch_store::Product;

use crate::{
    errors::{HandlerError, HandlerErrorKind},
    services::SearchServices,
};

/// Configure the search route. Only POST is served; every other method is
/// answered with 405 before the body is read.
pub fn configure(config: &mut ServiceConfig) {
    config.service(
        web::resource("/api/search")
            .route(web::post().to(search))
            .default_service(web::to(method_not_allowed)),
    );
}

/// Search for products matching a free-text query.
#[tracing::instrument(skip(request, body, services, settings))]
async fn search(
    request: HttpRequest,
    body: Bytes,
    services: Data<SearchServices>,
    settings: Data<Settings>,
) -> Result<HttpResponse, HandlerError> {
    let query =
        requested_query(request.content_type(), &body).ok_or(HandlerErrorKind::MissingQuery)?;
    safe_log_request(settings.log_full_request, &query);

    let results = services.search(&query).await.map_err(|error| {
        tracing::error!(%error, r#type = "web.search.error", "Error processing search query");
        HandlerError::internal()
    })?;

    tracing::debug!(
        r#type = "web.search.result-count",
        result_count = results.len(),
        "Providing search results"
    );

    Ok(HttpResponse::Ok().json(SearchResponse { results }))
}

/// Any method other than POST.
async fn method_not_allowed() -> Result<HttpResponse, HandlerError> {
    Err(HandlerErrorKind::MethodNotAllowed.into())
}

/// The response the API generates.
#[derive(Debug, Serialize)]
struct SearchResponse {
    /// Product rows, exactly as the store returned them.
    results: Vec<Product>,
}

/// Content types whose bodies are decoded as JSON.
const JSON_CONTENT_TYPES: [&str; 2] = ["application/json", "application/ld+json"];

/// Pull a usable query out of a request body. Bodies not sent as JSON, bodies
/// that are not JSON objects, and `query` values that are absent, null, empty
/// or not strings all count as missing.
fn requested_query(content_type: &str, body: &[u8]) -> Option<String> {
    if !JSON_CONTENT_TYPES
        .iter()
        .any(|json| content_type.eq_ignore_ascii_case(json))
    {
        return None;
    }
    let body: Value = serde_json::from_slice(body).ok()?;
    body.get("query")?
        .as_str()
        .filter(|query| !query.is_empty())
        .map(str::to_owned)
}

/// Log a search request. The query text is only included when `log_query` is
/// set, since shoppers may type anything into it.
fn safe_log_request(log_query: bool, query: &str) {
    let query = if log_query { query } else { "" };
    tracing::info!(
        r#type = "web.search.request",
        sensitive = true,
        %query,
        "handling search request"
    );
}
