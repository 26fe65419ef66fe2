//! Request path normalization.

/// Make sure a request path is absolute.
///
/// A leading `/` is added when missing; anything else is left untouched,
/// including `..` segments, which the resolver deals with. Applying it twice
/// gives the same result as applying it once.
pub fn normalize(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    }
}
