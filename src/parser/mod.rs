//! HTTP request parser.
//!
//! Turns the head of an HTTP/1.x request into an [`HttpRequest`]. Only the
//! request line and headers are parsed; the static file server never reads
//! request bodies.

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parse_request function
pub use request::parse_request;
