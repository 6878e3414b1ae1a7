//! Documentation that does not belong to any one crate.

pub mod api;
pub mod dev;
