//! A minimal static file HTTP server.
//!
//! `webd` serves a directory tree over plain HTTP/1.1, optionally behind
//! single-user Basic Authentication, and shuts down gracefully on SIGINT,
//! SIGTERM or SIGQUIT.
//!
//! # Features
//!
//! - Files are streamed with `Content-Type`, `Content-Length` and
//!   `Last-Modified`; `If-Modified-Since` is honoured
//! - Directories requested without a trailing slash are redirected to it;
//!   with the slash their `index.html` is served
//! - Request paths can never escape the served root
//! - Every request produces one access log line on an explicit log sink
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use webd::{Credentials, HttpServer, ServerConfig};
//!
//! # async fn run() -> Result<(), webd::ServerError> {
//! let config = ServerConfig {
//!     root: "./public".into(),
//!     credentials: Credentials::new("admin", "secret"),
//!     ..ServerConfig::default()
//! };
//!
//! let handle = HttpServer::bind(config).await?.spawn();
//! webd::shutdown_signal().await?;
//! handle.shutdown(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod parser;
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{
    Credentials, Error as ServerError, HttpResponse, HttpServer, LogSinks, RequestError, ServerConfig,
    ServerHandle, StaticHandler, StatusCode, shutdown_signal,
};
