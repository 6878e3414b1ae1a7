#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! Web server for Shopsearch's public API.
//!
//! The API is a single endpoint, `POST /api/search`, that takes a shopper's
//! free-text query, asks a language model what they are looking for, and
//! returns the products that match.

mod dockerflow;
mod errors;
mod logging;
mod search;
mod services;

use actix_cors::Cors;
use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use anyhow::{Context, Result};
use shopsearch_settings::Settings;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub use crate::errors::{HandlerError, HandlerErrorKind};
pub use crate::logging::ShopsearchRootSpanBuilder;
pub use crate::services::{SearchError, SearchServices};

/// Run the web server
///
/// The returned server is a `Future` that must either be `.await`ed, or run it
/// as a background task using `tokio::spawn`.
///
/// Most of the details from `settings` will be respected, except for those that
/// go into building the listener (the host and port). If you want to respect the
/// settings specified in that object, you must include them in the construction
/// of `listener`.
///
/// # Errors
///
/// Returns an error if the outbound clients cannot be built from `settings`, or
/// if the server cannot be started on the provided listener.
///
/// # Examples
///
/// Run the server in the foreground. This will only return if there is an error
/// that causes the server to shut down.
///
/// ```no_run
/// # actix_rt::System::new().block_on(async {
/// let listener = std::net::TcpListener::bind("127.0.0.1:8080")
///     .expect("Failed to bind port");
/// let settings = shopsearch_settings::Settings::load()
///     .expect("Failed to load settings");
/// shopsearch_web::run(listener, settings)
///     .expect("Failed to start server")
///     .await
///     .expect("Fatal error while running server");
/// # })
/// ```
pub fn run(listener: TcpListener, settings: Settings) -> Result<Server> {
    let services = SearchServices::from_settings(&settings)?;
    run_with_services(listener, settings, services)
}

/// Run the web server with already constructed search services.
///
/// # Errors
///
/// Returns an error if the server cannot be started on the provided listener.
pub fn run_with_services(
    listener: TcpListener,
    settings: Settings,
    services: SearchServices,
) -> Result<Server> {
    let num_workers = settings.http.workers;
    let settings = Data::new(settings);
    let services = Data::new(services);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(settings.clone())
            .app_data(services.clone())
            .wrap(TracingLogger::<ShopsearchRootSpanBuilder>::new())
            .wrap(Cors::permissive())
            .configure(configure_app)
    })
    .listen(listener)
    .context("Listening for connections")?;

    if let Some(n) = num_workers {
        server = server.workers(n);
    }

    Ok(server.run())
}

/// Register every route on an app. Does not include middleware or app data.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg
        // The core functionality
        .configure(search::configure)
        // Add the behavior necessary to satisfy Dockerflow.
        .configure(dockerflow::configure);
}

#[cfg(test)]
mod tests {
    use crate::{configure_app, SearchServices};
    use actix_web::{
        http::{Method, StatusCode},
        test::{self, TestRequest},
        web::Data,
        App,
    };
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use shopsearch_intent::{FixedIntentExtractor, Intent};
    use shopsearch_settings::Settings;
    use shopsearch_store::{Filter, MemoryStore, PostgrestError, ProductQuery};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    /// A search app wired to in-memory collaborators, plus handles to observe them.
    struct Harness {
        settings: Settings,
        services: SearchServices,
        extractions: Arc<AtomicUsize>,
        queries: Arc<Mutex<Vec<ProductQuery>>>,
    }

    impl Harness {
        fn new(extractor: FixedIntentExtractor, store: MemoryStore) -> Self {
            let extractions = extractor.calls();
            let queries = store.received();
            Self {
                settings: Settings::load_for_tests(|_| ()),
                services: SearchServices::new(Arc::new(extractor), Arc::new(store), "products"),
                extractions,
                queries,
            }
        }

        async fn call(&self, request: TestRequest) -> (StatusCode, Value) {
            let app = test::init_service(
                App::new()
                    .app_data(Data::new(self.settings.clone()))
                    .app_data(Data::new(self.services.clone()))
                    .configure(configure_app),
            )
            .await;
            let response = test::call_service(&app, request.to_request()).await;
            let status = response.status();
            let body = test::read_body(response).await;
            let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
            (status, body)
        }

        fn outbound_calls(&self) -> usize {
            self.extractions.load(Ordering::SeqCst) + self.queries.lock().unwrap().len()
        }
    }

    /// Log output captured from a `tracing_subscriber::fmt` subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        /// Route this thread's events here until the guard is dropped.
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_max_level(tracing::Level::INFO)
                .with_writer(move || writer.clone())
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn lines_containing(&self, pat: &str) -> Vec<String> {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .filter(|line| line.contains(pat))
                .map(str::to_owned)
                .collect()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn laptop_intent(use_case: Option<Vec<&str>>) -> Intent {
        Intent {
            product_type: "laptop".to_string(),
            use_case: use_case.map(|cases| cases.into_iter().map(String::from).collect()),
            budget: 1500.0,
            style: None,
        }
    }

    fn catalog() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "ROG Zephyrus", "tags": ["laptop", "asus"], "price": 1499, "use_case": ["gaming"]}),
            json!({"id": 2, "name": "ThinkPad E14", "tags": ["laptop"], "price": 900, "use_case": ["office"]}),
            json!({"id": 3, "name": "Legion Pro", "tags": ["laptop"], "price": 2400, "use_case": ["gaming"]}),
            json!({"id": 4, "name": "Redmi Note", "tags": ["phone"], "price": 200, "use_case": ["gaming"]}),
        ]
    }

    fn search_request(body: Value) -> TestRequest {
        TestRequest::post().uri("/api/search").set_json(body)
    }

    #[actix_rt::test]
    async fn other_methods_are_not_allowed() {
        let harness = Harness::new(
            FixedIntentExtractor::new(laptop_intent(None)),
            MemoryStore::new(catalog()),
        );

        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let (status, body) = harness
                .call(TestRequest::default().method(method).uri("/api/search"))
                .await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body, json!({"message": "Only POST requests allowed"}));
        }
        assert_eq!(harness.outbound_calls(), 0);
    }

    #[actix_rt::test]
    async fn missing_query_is_a_bad_request() {
        let harness = Harness::new(
            FixedIntentExtractor::new(laptop_intent(None)),
            MemoryStore::new(catalog()),
        );

        for body in [json!({}), json!({"query": ""}), json!({"query": null})] {
            let (status, body) = harness.call(search_request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"error": "Missing query"}));
        }
        let (status, _) = harness
            .call(TestRequest::post().uri("/api/search").set_payload("laptop"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(harness.outbound_calls(), 0);
    }

    #[actix_rt::test]
    async fn plain_text_bodies_are_not_decoded() {
        let harness = Harness::new(
            FixedIntentExtractor::new(laptop_intent(None)),
            MemoryStore::new(catalog()),
        );

        let (status, body) = harness
            .call(
                TestRequest::post()
                    .uri("/api/search")
                    .insert_header(("content-type", "text/plain"))
                    .set_payload(r#"{"query": "laptop"}"#),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing query"}));
        assert_eq!(harness.outbound_calls(), 0);
    }

    #[actix_rt::test]
    async fn use_case_is_required_in_full() {
        let harness = Harness::new(
            FixedIntentExtractor::new(laptop_intent(Some(vec!["gaming"]))),
            MemoryStore::new(catalog()),
        );

        let (status, body) = harness
            .call(search_request(json!({"query": "laptop gaming di bawah 1500"})))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"results": [catalog()[0].clone()]}));
        let queries = harness.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0].filters,
            vec![
                Filter::Contains {
                    column: "tags".to_string(),
                    values: vec!["laptop".to_string()]
                },
                Filter::LessThanOrEqual {
                    column: "price".to_string(),
                    value: 1500.0
                },
                Filter::Contains {
                    column: "use_case".to_string(),
                    values: vec!["gaming".to_string()]
                },
            ]
        );
    }

    #[actix_rt::test]
    async fn absent_or_empty_use_case_adds_no_filter() {
        for use_case in [None, Some(vec![])] {
            let harness = Harness::new(
                FixedIntentExtractor::new(laptop_intent(use_case)),
                MemoryStore::new(catalog()),
            );

            let (status, body) = harness
                .call(search_request(json!({"query": "laptop murah"})))
                .await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                body,
                json!({"results": [catalog()[0].clone(), catalog()[1].clone()]})
            );
            let queries = harness.queries.lock().unwrap();
            assert_eq!(queries[0].filters.len(), 2);
        }
    }

    #[actix_rt::test]
    async fn undecodable_intent_never_reaches_the_store() {
        let harness = Harness::new(
            FixedIntentExtractor::from_completion("Maaf, saya tidak mengerti."),
            MemoryStore::new(catalog()),
        );

        let (status, body) = harness
            .call(search_request(json!({"query": "laptop"})))
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to process query"}));
        assert_eq!(harness.extractions.load(Ordering::SeqCst), 1);
        assert!(harness.queries.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn store_errors_are_not_exposed() {
        let harness = Harness::new(
            FixedIntentExtractor::new(laptop_intent(None)),
            MemoryStore::failing(PostgrestError {
                code: Some("42P01".to_string()),
                message: "relation \"public.products\" does not exist".to_string(),
                ..Default::default()
            }),
        );

        let (status, body) = harness
            .call(search_request(json!({"query": "laptop"})))
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Failed to process query"}));
    }

    #[actix_rt::test]
    async fn rows_are_returned_unmodified() {
        let rows = vec![
            json!({"id": 10, "tags": ["laptop"], "price": 100, "use_case": [], "extra": {"nested": [1, 2]}}),
            json!({"id": 11, "tags": ["laptop"], "price": 1500.0, "use_case": ["work"], "stock": null}),
        ];
        let harness = Harness::new(
            FixedIntentExtractor::new(laptop_intent(None)),
            MemoryStore::new(rows.clone()),
        );

        let (status, body) = harness
            .call(search_request(json!({"query": "laptop"})))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "results": rows }));
    }

    #[actix_rt::test]
    async fn heartbeat_names_the_collaborators() {
        let harness = Harness::new(
            FixedIntentExtractor::new(laptop_intent(None)),
            MemoryStore::new(catalog()),
        );

        let (status, body) = harness
            .call(TestRequest::get().uri("/__heartbeat__"))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent_extractor"], json!("FixedIntentExtractor"));
        assert_eq!(body["product_store"], json!("MemoryStore(4 rows)"));
    }

    #[actix_rt::test]
    async fn failures_are_logged_once_with_their_cause() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let harness = Harness::new(
            FixedIntentExtractor::new(laptop_intent(None)),
            MemoryStore::failing(PostgrestError {
                message: "permission denied for table products".to_string(),
                ..Default::default()
            }),
        );

        let (status, _) = harness
            .call(search_request(json!({"query": "laptop"})))
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let errors = logs.lines_containing("web.search.error");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("permission denied for table products"));
        assert!(errors[0].contains("\"level\":\"ERROR\""));
    }

    #[actix_rt::test]
    async fn query_text_is_only_logged_when_enabled() {
        for log_full_request in [true, false] {
            let logs = CapturedLogs::default();
            let _guard = logs.install();
            let mut harness = Harness::new(
                FixedIntentExtractor::new(laptop_intent(None)),
                MemoryStore::new(catalog()),
            );
            harness.settings.log_full_request = log_full_request;

            harness
                .call(search_request(json!({"query": "laptop untuk kuliah"})))
                .await;

            let requests = logs.lines_containing("web.search.request");
            assert_eq!(requests.len(), 1);
            assert_eq!(
                requests[0].contains("laptop untuk kuliah"),
                log_full_request
            );
        }
    }
}
