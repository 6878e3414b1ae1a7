//! Tools for running tests

use crate::utils::logging::LogWatcher;
use httpmock::MockServer;
use reqwest::{redirect, Client, ClientBuilder, Method, RequestBuilder};
use shopsearch_settings::Settings;
use std::{future::Future, net::TcpListener};
use tracing_futures::{Instrument, WithSubscriber};
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt};

/// Run a test with a fully configured Shopsearch server.
///
/// The server will listen on a port assigned arbitrarily by the OS.
///
/// A suite of tools will be passed to the test function in the form of an
/// instance of [`TestingTools`]. It includes an HTTP client configured to use
/// the test server, HTTP mock servers that the completion API and the product
/// database have been configured to use, and a log collector that can make
/// assertions about logs that were printed.
///
/// # Example
///
/// ```
/// # use shopsearch_integration_tests::{shopsearch_test, TestingTools};
/// #[actix_rt::test]
/// async fn a_test() {
///     shopsearch_test(
///         |settings| settings.debug = false,
///         |TestingTools { test_client, mut log_watcher, .. }| async move {
///             assert!(true) // Test goes here
///         }
///     ).await
/// }
/// ```
///
/// # Panics
/// May panic if tests could not be set up correctly.
pub async fn shopsearch_test<FSettings, FTest, Fut>(
    settings_changer: FSettings,
    test: FTest,
) -> Fut::Output
where
    FSettings: FnOnce(&mut Settings),
    FTest: FnOnce(TestingTools) -> Fut,
    Fut: Future,
{
    let test_span = tracing::info_span!("shopsearch_test");

    // Load settings
    let mut settings = Settings::load_for_tests(|_| ());

    // Set up logging
    let log_watcher = LogWatcher::default();
    let log_watcher_writer = log_watcher.make_writer();

    let env_filter: tracing_subscriber::EnvFilter = (&settings.logging.levels).into();
    let tracing_subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(move || log_watcher_writer.clone()),
        )
        .with(tracing_subscriber::fmt::layer().pretty().with_test_writer());

    let _tracing_subscriber_guard = tracing::subscriber::set_default(tracing_subscriber);

    // Set up mock servers for the completion API and the database
    let intent_mock = MockServer::start_async().await;
    let store_mock = MockServer::start_async().await;
    settings.intent.base_url = intent_mock.url("/v1");
    settings.store.url = store_mock.base_url();

    settings_changer(&mut settings);

    // Run server in the background
    let listener = TcpListener::bind(settings.http.listen).expect("Failed to bind to a port");
    let address = listener.local_addr().unwrap().to_string();
    let server = shopsearch_web::run(listener, settings).expect("Failed to start server");
    let server_handle = tokio::spawn(server.with_current_subscriber());
    let test_client = TestReqwestClient::new(address);

    // Assemble the tools
    let tools = TestingTools {
        test_client,
        intent_mock,
        store_mock,
        log_watcher,
    };
    // Run the test
    let rv = test(tools).instrument(test_span).await;
    server_handle.abort();
    rv
}

/// A set of tools for tests, including mock servers and logging helpers.
///
/// The fields of this struct are marked as non-exhaustive, meaning that any
/// destructuring of this struct will require a `..` "and the rest" entry, even
/// if all present items are named. This makes adding tools in the future easier,
/// since old tests won't need to be rewritten to account for the added tools.
#[non_exhaustive]
pub struct TestingTools {
    /// A wrapper around a `reqwest::client` that automatically uses the
    /// server under test.
    pub test_client: TestReqwestClient,

    /// A [`httpmock::MockServer`] standing in for the chat completion API. It
    /// serves under `/v1`, and has no mocks until a test adds them.
    pub intent_mock: MockServer,

    /// A [`httpmock::MockServer`] standing in for the product database. It
    /// serves PostgREST paths under `/rest/v1`, and has no mocks until a test
    /// adds them.
    pub store_mock: MockServer,

    /// To make assertions about logs.
    pub log_watcher: LogWatcher,
}

/// A wrapper around a `[reqwest::client]` that automatically sends requests to
/// the test server.
///
/// The client is configured to not follow any redirects.
pub struct TestReqwestClient {
    /// The wrapped client.
    client: Client,

    /// The server address to implicitly use for all requests.
    address: String,
}

impl TestReqwestClient {
    /// Construct a new test client that uses `address` for every request given.
    pub fn new(address: String) -> Self {
        let client = ClientBuilder::new()
            .redirect(redirect::Policy::none())
            .build()
            .expect("Could not build test client");
        Self { client, address }
    }

    /// Start building a request to the test server with the method and path
    /// specified.
    ///
    /// The path should start with `/`, such as `/__heartbeat__`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        assert!(path.starts_with('/'));
        let url = format!("http://{}{}", &self.address, path);
        self.client.request(method, url)
    }

    /// Start building a GET request to the test server with the path specified.
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    /// Start building a POST request to the test server with the path specified.
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }
}
