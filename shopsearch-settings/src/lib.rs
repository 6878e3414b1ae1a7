#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! # Shopsearch Settings
//!
//! Configuration is specified in several ways, with later methods overriding earlier ones.
//!
//! 1. A base configuration checked into the repository, in `config/base.yaml`.
//!    This provides the default values for most settings.
//! 2. Per-environment configuration files in the `config` directory. The
//!    environment is selected using the environment variable `SHOPSEARCH_ENV`.
//!    The settings for that environment are then loaded from
//!    `config/${env}.yaml`, if it exists. The default environment is
//!    "development".
//! 3. A local configuration file not checked into the repository, at
//!    `config/local.yaml`. This file is in `.gitignore` and is the place for
//!    local secrets.
//! 4. Environment variables that begin with `SHOPSEARCH_` and use `__` to
//!    separate levels. For example, `Settings::http::workers` can be controlled
//!    from the environment variable `SHOPSEARCH_HTTP__WORKERS`.
//! 5. The conventional variables `SUPABASE_URL`, `SUPABASE_ANON_KEY` and
//!    `OPENAI_API_KEY`, which set `store.url`, `store.api_key` and
//!    `intent.api_key` respectively.
//!
//! The store URL and both API keys have no default. If none of the sources
//! above provide them, loading fails and the service does not start.
//!
//! Tests should use `Settings::load_for_tests` which only reads from
//! `config/base.yaml`, `config/test.yaml`, and `config/local_test.yaml` (if it
//! exists). It does not read from environment variables.

mod logging;

pub use logging::{DirectiveWrapper, LogFormat, LoggingSettings};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::{net::SocketAddr, time::Duration};

/// Environment variables read for compatibility with the usual hosting setup,
/// and the setting each one overrides.
const CONVENTIONAL_ENV_VARS: [(&str, &str); 3] = [
    ("SUPABASE_URL", "store.url"),
    ("SUPABASE_ANON_KEY", "store.api_key"),
    ("OPENAI_API_KEY", "intent.api_key"),
];

/// Top level settings object for Shopsearch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// The environment the service is running in. Should only be set with the
    /// `SHOPSEARCH_ENV` environment variable.
    pub env: String,

    /// Enable additional features to debug the application. This should not be
    /// set to true in production environments.
    pub debug: bool,

    /// Include the shopper's raw query text in request logs.
    pub log_full_request: bool,

    /// Settings for the HTTP server.
    pub http: HttpSettings,

    /// Logging settings.
    pub logging: LoggingSettings,

    /// Settings for the intent extraction service.
    pub intent: IntentSettings,

    /// Settings for the product store.
    pub store: StoreSettings,
}

/// Settings for the HTTP server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpSettings {
    /// The host and port to listen on, such as "127.0.0.1:8080" or "0.0.0.0:80".
    pub listen: SocketAddr,

    /// The number of workers to use. Optional. If no value is provided, the
    /// number of logical cores will be used.
    pub workers: Option<usize>,
}

/// Settings for the chat completion API used to extract search intent.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntentSettings {
    /// Base URL of an OpenAI compatible API, such as `https://api.openai.com/v1`.
    /// `/chat/completions` is appended to it.
    pub base_url: String,

    /// Bearer token for the API.
    pub api_key: String,

    /// The model identifier sent with each completion request.
    pub model: String,

    /// The system instruction describing the extraction task and schema.
    pub system_prompt: String,

    /// How long to wait while establishing a connection.
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(rename = "connect_timeout_ms")]
    pub connect_timeout: Duration,

    /// How long to wait for a whole completion request. Completions are slow,
    /// so this is generous.
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(rename = "request_timeout_ms")]
    pub request_timeout: Duration,
}

/// Settings for the hosted PostgREST database holding products.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Project URL, such as `https://xyzcompany.supabase.co`. The REST API is
    /// expected under `/rest/v1`.
    pub url: String,

    /// The anonymous access key, sent as both `apikey` and bearer token.
    pub api_key: String,

    /// The table to search.
    pub table: String,

    /// How long to wait while establishing a connection.
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(rename = "connect_timeout_ms")]
    pub connect_timeout: Duration,

    /// How long to wait for a whole query.
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(rename = "request_timeout_ms")]
    pub request_timeout: Duration,
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// # Errors
    /// If any of the configured values are invalid, if any of the required
    /// configuration files are missing, or if a required value (such as an API
    /// key) was not provided by any source.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("./config")
    }

    /// Load settings like [`Settings::load`], reading files from `config_dir`.
    fn load_from(config_dir: &str) -> Result<Self, ConfigError> {
        let shopsearch_env =
            std::env::var("SHOPSEARCH_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder()
            // Start off with the base config.
            .add_source(File::with_name(&format!("{}/base", config_dir)))
            .set_override("env", shopsearch_env.as_str())?
            // Merge in an environment specific config.
            .add_source(
                File::with_name(&format!("{}/{}", config_dir, shopsearch_env)).required(false),
            )
            // Add a local configuration file that is `.gitignore`ed.
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            // Add environment variables that start with "SHOPSEARCH_" and have
            // "__" to separate levels. For example, `SHOPSEARCH_HTTP__LISTEN`
            // maps to `Settings::http::listen`.
            .add_source(
                Environment::with_prefix("SHOPSEARCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in CONVENTIONAL_ENV_VARS {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        builder.build()?.try_deserialize()
    }

    /// Load settings from configuration files for tests.
    ///
    /// `changer` can adjust the loaded settings before they are returned.
    ///
    /// # Panics
    /// If the test configuration files are missing or invalid.
    pub fn load_for_tests<F: FnOnce(&mut Self)>(changer: F) -> Self {
        let mut settings: Self = Config::builder()
            // Start off with the base config.
            .add_source(File::with_name("../config/base"))
            // Merge in test specific config.
            .set_override("env", "test")
            .expect("Could not set env for tests")
            .add_source(File::with_name("../config/test"))
            // Add a local configuration file that is `.gitignore`ed.
            .add_source(File::with_name("../config/local_test").required(false))
            .build()
            .expect("Could not load settings for tests")
            .try_deserialize()
            .expect("Could not convert settings");
        changer(&mut settings);
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use anyhow::{Context, Result};
    use config::{Config, File};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_settings_load() {
        let settings = Settings::load_for_tests(|_| ());
        assert_eq!(settings.env, "test");
        assert_eq!(settings.store.table, "products");
        assert_eq!(settings.intent.model, "gpt-4");
        assert!(settings
            .intent
            .system_prompt
            .contains("product_type, use_case (array), budget (number), and style (optional)"));
    }

    #[test]
    fn test_changer_is_applied() {
        let settings = Settings::load_for_tests(|settings| {
            settings.debug = true;
            settings.store.table = "other_products".to_string();
        });
        assert!(settings.debug);
        assert_eq!(settings.store.table, "other_products");
    }

    #[test]
    fn durations_are_milliseconds() -> Result<()> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name("../config/base"))
            .add_source(File::with_name("../config/test"))
            .set_override("env", "test")?
            .set_override("intent.request_timeout_ms", 1500_i64)?
            .build()?
            .try_deserialize()
            .context("could not convert settings")?;

        assert_eq!(settings.intent.request_timeout, Duration::from_millis(1500));
        Ok(())
    }

    #[test]
    fn credentials_are_required() {
        // The base config alone does not carry any credentials.
        let result = Config::builder()
            .add_source(File::with_name("../config/base"))
            .set_override("env", "test")
            .and_then(|builder| builder.build())
            .and_then(|config| config.try_deserialize::<Settings>());

        assert!(result.is_err(), "settings without credentials must not load");
    }

    #[test]
    fn environment_variables_override_files() {
        let vars = [
            ("SHOPSEARCH_ENV", "test"),
            ("SHOPSEARCH_HTTP__WORKERS", "7"),
            ("SHOPSEARCH_STORE__TABLE", "from_env"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon-from-env"),
            ("OPENAI_API_KEY", "sk-from-env"),
        ];
        for (var, value) in vars {
            std::env::set_var(var, value);
        }

        let result = Settings::load_from("../config");
        for (var, _) in vars {
            std::env::remove_var(var);
        }
        let settings = result.expect("settings should load");

        assert_eq!(settings.env, "test");
        assert_eq!(settings.http.workers, Some(7));
        assert_eq!(settings.store.table, "from_env");
        assert_eq!(settings.store.url, "https://abc.supabase.co");
        assert_eq!(settings.store.api_key, "anon-from-env");
        assert_eq!(settings.intent.api_key, "sk-from-env");
    }
}
