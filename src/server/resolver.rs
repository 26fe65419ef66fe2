//! Maps request paths onto files under the served root.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use log::debug;
use percent_encoding::percent_decode_str;
use tokio::fs::{self, File};

use crate::server::error::RequestError;

/// Document served for a directory requested with a trailing slash.
pub const INDEX_FILE: &str = "index.html";

/// What a request path points at.
#[derive(Debug)]
pub enum ResolvedEntry {
    /// A regular file, already opened for reading.
    File {
        file: File,
        size: u64,
        modified: Option<SystemTime>,
        path: PathBuf,
    },
    /// A directory without an index document, or one requested without the
    /// trailing slash.
    Directory { has_trailing_slash: bool },
}

/// Resolves normalized request paths under a root directory.
///
/// Nothing outside the root is ever opened: `..` segments cannot climb
/// above it, and symlinks whose target lies outside it are refused.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    root: PathBuf,
}

impl StaticResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a normalized, still percent-encoded path without its query.
    pub async fn resolve(&self, canonical_path: &str) -> Result<ResolvedEntry, RequestError> {
        let decoded = percent_decode_str(canonical_path)
            .decode_utf8()
            .map_err(|_| RequestError::NotExist)?;
        let has_trailing_slash = decoded.ends_with('/');
        let relative = clean(&decoded)?;

        let root = fs::canonicalize(&self.root).await?;
        let target = self.contained(&root, &root.join(&relative)).await?;

        let metadata = fs::metadata(&target).await?;
        if !metadata.is_dir() {
            return open(target).await;
        }
        if !has_trailing_slash {
            return Ok(ResolvedEntry::Directory { has_trailing_slash: false });
        }

        match self.contained(&root, &target.join(INDEX_FILE)).await {
            Ok(index) => match open(index).await {
                Ok(entry @ ResolvedEntry::File { .. }) => Ok(entry),
                Ok(ResolvedEntry::Directory { .. }) | Err(RequestError::NotExist) => {
                    Ok(ResolvedEntry::Directory { has_trailing_slash: true })
                }
                Err(e) => Err(e),
            },
            Err(RequestError::NotExist) => Ok(ResolvedEntry::Directory { has_trailing_slash: true }),
            Err(e) => Err(e),
        }
    }

    /// Canonicalize `path` and check it is still under `root`.
    async fn contained(&self, root: &Path, path: &Path) -> Result<PathBuf, RequestError> {
        let resolved = fs::canonicalize(path).await?;
        if !resolved.starts_with(root) {
            debug!("Refusing {} outside of {}", resolved.display(), root.display());
            return Err(RequestError::PermissionDenied);
        }
        Ok(resolved)
    }
}

/// Lexically clean a decoded request path into a path relative to the root.
///
/// `.` and empty segments are dropped; `..` removes the previous segment and
/// is ignored at the top, so the result never starts above the root.
fn clean(decoded: &str) -> Result<PathBuf, RequestError> {
    if decoded.contains('\0') {
        return Err(RequestError::NotExist);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => {
                // A segment must stay a single plain name on this platform,
                // e.g. `a\..\..` on Windows.
                let mut components = Path::new(other).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => segments.push(other),
                    _ => return Err(RequestError::NotExist),
                }
            }
        }
    }

    Ok(segments.iter().collect())
}

async fn open(path: PathBuf) -> Result<ResolvedEntry, RequestError> {
    let file = File::open(&path).await?;
    let metadata = file.metadata().await?;
    if metadata.is_dir() {
        return Ok(ResolvedEntry::Directory { has_trailing_slash: true });
    }

    Ok(ResolvedEntry::File {
        file,
        size: metadata.len(),
        modified: metadata.modified().ok(),
        path,
    })
}
