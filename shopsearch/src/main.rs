#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! A web API that turns free-text shopper queries into product searches.
//!
//! Shopsearch is split into several subcrates that work in collaboration.
//!
//! - [shopsearch-settings](../shopsearch_settings/index.html)
//! - [shopsearch-intent](../shopsearch_intent/index.html)
//! - [shopsearch-store](../shopsearch_store/index.html)
//! - [shopsearch-web](../shopsearch_web/index.html)
//! - [shopsearch-integration-tests](../shopsearch_integration_tests/index.html)

mod docs;

use anyhow::{Context, Result};
use shopsearch_settings::{LogFormat, Settings};
use std::net::TcpListener;
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Primary entry point
#[actix_rt::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Loading settings")?;
    init_logging(&settings)?;
    let listener = TcpListener::bind(settings.http.listen).context("Binding port")?;
    tracing::info!(
        r#type = "app.starting",
        env = %settings.env,
        listen = %settings.http.listen,
        "Starting shopsearch"
    );

    shopsearch_web::run(listener, settings)
        .context("Starting shopsearch-web server")?
        .await
        .context("Running shopsearch-web server")?;

    Ok(())
}

/// Set up logging, based on settings and the `RUST_LOG` environment variable.
fn init_logging(settings: &Settings) -> Result<()> {
    LogTracer::init()?;
    let env_filter: EnvFilter = (&settings.logging.levels).into();
    let registry = tracing_subscriber::registry().with(env_filter);

    match settings.logging.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().pretty()),
        )?,
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            ),
        )?,
        LogFormat::Compact => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().compact()),
        )?,
    };

    Ok(())
}
