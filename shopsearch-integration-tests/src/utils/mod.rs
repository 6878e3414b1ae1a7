//! Helpers shared by the integration tests.

pub mod logging;
pub mod mocks;
pub mod test_tools;
