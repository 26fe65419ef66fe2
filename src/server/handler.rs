//! The per-request pipeline: authentication, path normalization, resolution
//! and the response that follows from it.

use std::collections::HashMap;
use std::io;
use std::time::{Instant, SystemTime};

use chrono::{DateTime, Utc};
use log::debug;
use mime_guess::mime;
use tokio::io::AsyncWrite;

use crate::parser::{HttpRequest, Method};
use crate::server::auth::authenticate;
use crate::server::config::{Credentials, ServerConfig};
use crate::server::error::RequestError;
use crate::server::logging::LogSinks;
use crate::server::path::normalize;
use crate::server::resolver::{ResolvedEntry, StaticResolver};
use crate::server::response::{HttpResponse, StatusCode};

/// Transient state of one request, dropped once it has been answered.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// The request target as received, query included.
    pub raw_path: String,
    pub normalized_path: String,
    pub start: Instant,
}

impl RequestContext {
    pub fn new(request: &HttpRequest) -> Self {
        Self {
            method: request.method,
            raw_path: request.path.clone(),
            normalized_path: normalize(request.path_only()),
            start: Instant::now(),
        }
    }
}

/// Serves static files from a root directory behind an optional Basic Auth gate.
#[derive(Debug, Clone)]
pub struct StaticHandler {
    credentials: Credentials,
    resolver: StaticResolver,
    logs: LogSinks,
}

impl StaticHandler {
    pub fn new(credentials: Credentials, resolver: StaticResolver, logs: LogSinks) -> Self {
        Self {
            credentials,
            resolver,
            logs,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.credentials.clone(),
            StaticResolver::new(config.root.clone()),
            config.logs.clone(),
        )
    }

    /// Answer `request` on `writer` and log the outcome.
    ///
    /// Exactly one access log line is written per call, whether the request
    /// succeeded, was redirected, was refused, or the write itself failed.
    pub async fn serve<W>(&self, request: &HttpRequest, writer: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let context = RequestContext::new(request);
        let response = self.respond(request, &context).await;
        let result = response.write_to(writer).await;
        self.log_outcome(&context);
        result
    }

    /// Build the response for `request` without writing or logging it.
    pub async fn handle(&self, request: &HttpRequest) -> HttpResponse {
        self.respond(request, &RequestContext::new(request)).await
    }

    async fn respond(&self, request: &HttpRequest, context: &RequestContext) -> HttpResponse {
        let mut headers = HashMap::new();

        let response = match authenticate(request, &self.credentials, &mut headers) {
            Err(err) => self.to_http_error(err),
            Ok(()) => match self.resolver.resolve(&context.normalized_path).await {
                Ok(ResolvedEntry::Directory { has_trailing_slash: false }) => {
                    redirect_to_directory(&context.normalized_path, request.query())
                }
                Ok(ResolvedEntry::Directory { has_trailing_slash: true }) => {
                    // Listings are not rendered.
                    self.to_http_error(RequestError::PermissionDenied)
                }
                Ok(ResolvedEntry::File {
                    file,
                    size,
                    modified,
                    path,
                }) => {
                    debug!("Serving {} ({size} bytes)", path.display());
                    file_response(request, file, size, modified, &path)
                }
                Err(err) => self.to_http_error(err),
            },
        };

        let mut response = headers
            .into_iter()
            .fold(response, |response, (name, value)| response.with_header(name, value));
        if request.method.is_head() {
            response = response.without_body();
        }
        response
    }

    /// Turn a request error into the response sent to the client.
    ///
    /// This is the only place request errors are logged.
    pub fn to_http_error(&self, err: RequestError) -> HttpResponse {
        let (status, message) = err.status_and_message();
        self.logs.error(format!(
            "error response [{code}]: {err} / {message}",
            code = status.as_u16()
        ));

        HttpResponse::new(status)
            .with_content_type("text/plain; charset=utf-8")
            .with_header("X-Content-Type-Options", "nosniff")
            .with_body_string(format!("{message}\n"))
    }

    fn log_outcome(&self, context: &RequestContext) {
        let elapsed = format!("{:?}", context.start.elapsed());
        self.logs.info(format!(
            "{method:<5}\t{elapsed:<12}\t{path}",
            method = context.method,
            path = context.raw_path
        ));
    }
}

/// 301 to the same path with a trailing slash, keeping the query.
///
/// Leading slashes are collapsed so the target stays on this host.
fn redirect_to_directory(path: &str, query: Option<&str>) -> HttpResponse {
    let mut location = format!("/{}/", path.trim_start_matches(['/', '\\']));
    if let Some(query) = query {
        location.push('?');
        location.push_str(query);
    }

    HttpResponse::new(StatusCode::MovedPermanently)
        .with_header("Location", location)
        .with_header("Content-Length", "0")
}

fn file_response(
    request: &HttpRequest,
    file: tokio::fs::File,
    size: u64,
    modified: Option<SystemTime>,
    path: &std::path::Path,
) -> HttpResponse {
    let mut response = HttpResponse::new(StatusCode::Ok);

    if let Some(modified) = modified {
        let last_modified = http_date(modified);
        if not_modified_since(request, modified) {
            return HttpResponse::new(StatusCode::NotModified).with_header("Last-Modified", last_modified);
        }
        response = response.with_header("Last-Modified", last_modified);
    }

    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    let content_type = if content_type.type_() == mime::TEXT && content_type.get_param(mime::CHARSET).is_none() {
        format!("{content_type}; charset=utf-8")
    } else {
        content_type.to_string()
    };

    response.with_content_type(content_type).with_file(file, size)
}

/// Format a timestamp as an IMF-fixdate (RFC 9110, section 5.6.7).
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Whether `If-Modified-Since` allows a 304. Compared at second precision.
fn not_modified_since(request: &HttpRequest, modified: SystemTime) -> bool {
    if !matches!(request.method, Method::GET | Method::HEAD) {
        return false;
    }
    let Some(since) = request.get_header("If-Modified-Since") else {
        return false;
    };
    let Ok(since) = DateTime::parse_from_rfc2822(since) else {
        return false;
    };
    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}
