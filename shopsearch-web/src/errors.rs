//! Any errors that shopsearch-web might generate, and supporting implementations.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use backtrace::Backtrace;
use serde_json::Value;
use thiserror::Error;

/// The error type returned by web handlers.
pub struct HandlerError {
    /// The wrapped error value.
    kind: HandlerErrorKind,
    /// The backtrace related to the wrapped error.
    pub(crate) backtrace: Backtrace,
}

/// An error that happened in a web handler.
///
/// The display text of each variant is exactly what clients see. Details about
/// internal errors are logged, never sent.
#[derive(Error, Debug, PartialEq)]
pub enum HandlerErrorKind {
    /// Anything that failed after the request was accepted.
    #[error("Failed to process query")]
    Internal,

    /// The request body had no usable `query`.
    #[error("Missing query")]
    MissingQuery,

    /// The endpoint was called with a method other than POST.
    #[error("Only POST requests allowed")]
    MethodNotAllowed,
}

impl HandlerErrorKind {
    /// Convert the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingQuery => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// The name of the JSON field the message is reported under.
    fn body_field(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "message",
            Self::Internal | Self::MissingQuery => "error",
        }
    }
}

impl From<HandlerErrorKind> for actix_web::Error {
    fn from(kind: HandlerErrorKind) -> Self {
        let error: HandlerError = kind.into();
        error.into()
    }
}

impl HandlerError {
    /// Access the wrapped error.
    pub fn kind(&self) -> &HandlerErrorKind {
        &self.kind
    }

    /// Get a `HandlerError` representing an `Internal` error.
    pub fn internal() -> Self {
        HandlerErrorKind::Internal.into()
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.kind.source()
    }
}

impl<T> From<T> for HandlerError
where
    HandlerErrorKind: From<T>,
{
    fn from(item: T) -> Self {
        HandlerError {
            kind: HandlerErrorKind::from(item),
            backtrace: Backtrace::new(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        // Name the struct after the kind, so request logs group errors by kind.
        fmt.debug_struct(&format!("HandlerError/{:?}", &self.kind))
            .field("kind", &self.kind)
            .field("backtrace", &self.backtrace)
            .finish()
    }
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HashMap::new();
        response.insert(
            self.kind.body_field(),
            Value::String(self.kind.to_string()),
        );
        HttpResponse::build(self.status_code()).json(response)
    }
}
