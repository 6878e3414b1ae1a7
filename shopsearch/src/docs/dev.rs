//! # Developer documentation for working on Shopsearch
//!
//! Run the main app. The store URL and API keys must be provided, either in
//! `config/local.yaml` or through the environment.
//!
//! ```shell
//! $ SUPABASE_URL=https://xyz.supabase.co \
//!   SUPABASE_ANON_KEY=... \
//!   OPENAI_API_KEY=... \
//!   cargo run -p shopsearch
//! ```
//!
//! Run specific tests for one crate
//!
//! ```shell
//! $ cargo test -p shopsearch-integration-tests -- search
//! ```
//!
//! ## Testing strategies
//!
//! Unit tests live next to the code they test. The HTTP clients are tested
//! against `httpmock` servers, and the web handlers against the in-memory
//! `FixedIntentExtractor` and `MemoryStore`.
//!
//! `shopsearch-integration-tests` starts a complete server on an OS assigned
//! port, with mock servers standing in for the completion API and the
//! database, and tests it from the outside through HTTP.
