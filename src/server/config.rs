//! Server configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::server::logging::LogSinks;

/// Single-user Basic Auth credentials.
///
/// An empty username disables authentication, whatever the password.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials that leave every request unauthenticated.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.username.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory tree served to clients.
    pub root: PathBuf,
    /// Host name or address to bind to.
    pub host: String,
    /// Port to bind to; 0 picks a free one.
    pub port: u16,
    /// Basic Auth credentials.
    pub credentials: Credentials,
    /// Limit for reading a request head; also the shutdown deadline used by
    /// the binary.
    pub read_timeout: Duration,
    /// Where request outcomes and lifecycle messages go.
    pub logs: LogSinks,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size, which also bounds the request head.
    pub read_buffer_size: usize,
}

impl ServerConfig {
    /// The `host:port` pair to bind, bracketing IPv6 literals.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            host: "127.0.0.1".to_string(),
            port: 8080,
            credentials: Credentials::none(),
            read_timeout: Duration::from_secs(5),
            logs: LogSinks::stdio(),
            max_connections: 1024,
            read_buffer_size: 8192,
        }
    }
}
