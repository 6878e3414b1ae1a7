//! An actix-web service to implement [Dockerflow](https://github.com/mozilla-services/Dockerflow).

use std::collections::HashMap;

use actix_web::{
    get,
    web::{self, Data},
    HttpResponse,
};
use serde_json::Value;

use crate::{errors::HandlerError, services::SearchServices};

/// Handles required Dockerflow Endpoints.
pub fn configure(config: &mut web::ServiceConfig) {
    config
        .service(lbheartbeat)
        .service(heartbeat)
        .service(version)
        .service(test_error);
}

/// Used by the load balancer to indicate that the server can respond to
/// requests. Should just return OK.
#[get("/__lbheartbeat__")]
async fn lbheartbeat() -> HttpResponse {
    HttpResponse::Ok().body("")
}

/// Return the contents of the `version.json` file written at build time (or
/// the placeholder stored in the repository).
#[get("/__version__")]
async fn version() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(include_str!("../version.json"))
}

/// Returns a status message indicating the current state of the server.
#[get("/__heartbeat__")]
async fn heartbeat(services: Data<SearchServices>) -> HttpResponse {
    let mut checklist = HashMap::new();
    checklist.insert(
        "version".to_owned(),
        Value::String(env!("CARGO_PKG_VERSION").to_owned()),
    );
    checklist.insert(
        "intent_extractor".to_owned(),
        Value::String(services.extractor_name()),
    );
    checklist.insert(
        "product_store".to_owned(),
        Value::String(services.store_name()),
    );
    HttpResponse::Ok().json(checklist)
}

/// Returning an API error to test error handling.
#[get("/__error__")]
async fn test_error() -> Result<HttpResponse, HandlerError> {
    Err(HandlerError::internal())
}
