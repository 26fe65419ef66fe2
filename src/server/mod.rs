//! Static file server.
//!
//! A request flows through the [`handler::StaticHandler`]: the Basic Auth
//! gate, path normalization, resolution under the root directory, and
//! finally a file, a redirect or an error response. [`HttpServer`] owns the
//! socket and the graceful shutdown around it.

mod auth;
mod config;
mod error;
mod handler;
mod http_server;
mod logging;
mod path;
mod resolver;
mod response;
mod signal;

// Re-export public items
pub use auth::{authenticate, WWW_AUTHENTICATE};
pub use config::{Credentials, ServerConfig};
pub use error::{Error, RequestError};
pub use handler::{http_date, RequestContext, StaticHandler};
pub use http_server::{HttpServer, ServerHandle};
pub use logging::{LogSink, LogSinks, MemorySink, WriterSink};
pub use path::normalize;
pub use resolver::{ResolvedEntry, StaticResolver, INDEX_FILE};
pub use response::{Body, HttpResponse, StatusCode};
pub use signal::shutdown_signal;
