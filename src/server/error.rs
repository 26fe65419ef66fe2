//! Error types for the HTTP server.

use std::io;

use thiserror::Error;

use crate::parser::Error as ParserError;
use crate::server::response::StatusCode;

/// Errors that can occur while running the server.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// The request head did not fit in the read buffer.
    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The shutdown deadline passed with connections still being served.
    #[error("shutdown deadline exceeded with {outstanding} connection(s) still active")]
    ShutdownTimeout { outstanding: usize },

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Why a single request could not be answered with content.
///
/// Every variant is recovered at the request handler and turned into a
/// response; none of them outlive the request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("basic auth required")]
    AuthRequired,

    #[error("basic auth failed")]
    AuthFailed,

    #[error("file does not exist")]
    NotExist,

    #[error("permission denied")]
    PermissionDenied,

    #[error("{0}")]
    Internal(String),
}

impl RequestError {
    /// Status code and body text sent to the client.
    pub fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            RequestError::NotExist => (StatusCode::NotFound, "404 page not found"),
            RequestError::PermissionDenied => (StatusCode::Forbidden, "403 Forbidden"),
            RequestError::AuthRequired => (StatusCode::Unauthorized, "401 Unauthorized (auth required)"),
            RequestError::AuthFailed => (StatusCode::Unauthorized, "401 Unauthorized (auth failed)"),
            RequestError::Internal(_) => (StatusCode::InternalServerError, "500 Internal Server Error"),
        }
    }
}

impl From<io::Error> for RequestError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => RequestError::NotExist,
            io::ErrorKind::PermissionDenied => RequestError::PermissionDenied,
            _ => RequestError::Internal(err.to_string()),
        }
    }
}
