//! Basic Auth gate.

use std::collections::HashMap;

use crate::parser::HttpRequest;
use crate::server::config::Credentials;
use crate::server::error::RequestError;

/// Challenge sent whenever authentication is configured.
pub const WWW_AUTHENTICATE: &str = r#"Basic realm="auth""#;

/// Check `request` against the configured credentials.
///
/// With authentication enabled the challenge header is placed in
/// `response_headers` on every call, successful or not. Credentials are
/// compared as plain bytes, not in constant time.
pub fn authenticate(
    request: &HttpRequest,
    credentials: &Credentials,
    response_headers: &mut HashMap<String, String>,
) -> Result<(), RequestError> {
    if !credentials.is_enabled() {
        return Ok(());
    }
    response_headers.insert("WWW-Authenticate".to_string(), WWW_AUTHENTICATE.to_string());

    let (user, password) = request.basic_auth().ok_or(RequestError::AuthRequired)?;
    if user != credentials.username || password != credentials.password {
        return Err(RequestError::AuthFailed);
    }
    Ok(())
}
