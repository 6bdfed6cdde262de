//! Mapping untrusted request targets onto the document root
//!
//! Resolution runs in two phases. [`PathResolver::locate`] decodes the
//! target, drops the query string, rejects anything containing `..`, joins
//! the result onto the root and canonicalizes it, then verifies the canonical
//! path is still inside the root. [`Candidate::check_extension`] then applies
//! the content type whitelist.
//!
//! Rejections from the first phase are bad requests (400); the whitelist
//! rejection is forbidden (403). Whether the file exists is left to the
//! caller (404).

use percent_encoding::percent_decode_str;
use std::ffi::OsStr;
use std::io;
use std::path::{MAIN_SEPARATOR, MAIN_SEPARATOR_STR, Path, PathBuf};
use tokio::fs;

use crate::config::StaticFilesConfig;
use crate::http::mime::ContentTypeRegistry;
use crate::http::response::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("malformed percent-encoding in {0:?}")]
    MalformedEncoding(String),

    #[error("invalid character in path {0:?}")]
    InvalidPath(String),

    #[error("path traversal attempt in {0:?}")]
    Traversal(String),

    #[error("{} is outside the document root", .0.display())]
    OutsideRoot(PathBuf),

    #[error("extension of {} is not servable", .0.display())]
    Forbidden(PathBuf),

    #[error("failed to canonicalize path: {0}")]
    Io(#[from] io::Error),
}

impl ResolveError {
    pub fn status(&self) -> StatusCode {
        match self {
            ResolveError::MalformedEncoding(_)
            | ResolveError::InvalidPath(_)
            | ResolveError::Traversal(_)
            | ResolveError::OutsideRoot(_) => StatusCode::BadRequest,
            ResolveError::Forbidden(_) => StatusCode::Forbidden,
            ResolveError::Io(_) => StatusCode::InternalServerError,
        }
    }
}

/// A canonical path inside the document root whose extension has not been
/// checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub absolute_path: PathBuf,
    pub url_path: String,
}

/// A path that is safe and allowed to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Canonical filesystem path, a descendant of the document root
    pub absolute_path: PathBuf,
    /// Decoded request path without the query string
    pub url_path: String,
    /// Lower-cased extension with its leading dot
    pub extension: String,
    /// MIME type from the registry
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    default_document: String,
    case_insensitive: bool,
}

impl PathResolver {
    /// `root` must already be canonical.
    pub fn new(root: impl Into<PathBuf>, default_document: impl Into<String>, case_insensitive: bool) -> Self {
        Self {
            root: root.into(),
            default_document: default_document.into(),
            case_insensitive,
        }
    }

    pub fn from_config(cfg: &StaticFilesConfig) -> Self {
        Self::new(
            cfg.document_root.clone(),
            cfg.default_document.clone(),
            cfg.case_insensitive_paths,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `target` and applies the whitelist in one step.
    pub async fn resolve(&self, target: &str, registry: &ContentTypeRegistry) -> Result<ResolvedPath, ResolveError> {
        self.locate(target).await?.check_extension(registry)
    }

    /// Maps `target` to a canonical path inside the root.
    pub async fn locate(&self, target: &str) -> Result<Candidate, ResolveError> {
        let decoded = decode_target(target)?;
        let url_path = strip_query(&decoded).to_string();
        let normalized = normalize_separators(&url_path);

        if normalized.contains('\0') {
            return Err(ResolveError::InvalidPath(normalized));
        }

        // Cheap first filter; containment below is the real guarantee.
        if normalized.contains("..") {
            return Err(ResolveError::Traversal(normalized));
        }

        let relative = normalized.trim_start_matches(MAIN_SEPARATOR);
        let joined = self.root.join(relative);
        let canonical = canonicalize_lenient(&joined).await?;

        if !self.contains(&canonical) {
            return Err(ResolveError::OutsideRoot(canonical));
        }

        if !self.is_root(&canonical) {
            return Ok(Candidate {
                absolute_path: canonical,
                url_path,
            });
        }

        // The default document may itself be a link pointing elsewhere.
        let index = canonicalize_lenient(&self.root.join(&self.default_document)).await?;
        if !self.contains(&index) || self.is_root(&index) {
            return Err(ResolveError::OutsideRoot(index));
        }

        Ok(Candidate {
            absolute_path: index,
            url_path: format!("/{}", self.default_document),
        })
    }

    /// Whether `path` is the root or one of its descendants, compared by
    /// component.
    pub fn contains(&self, path: &Path) -> bool {
        if !self.case_insensitive {
            return path.starts_with(&self.root);
        }

        let mut components = path.components();
        self.root.components().all(|root_part| {
            components
                .next()
                .is_some_and(|part| eq_ignore_case(part.as_os_str(), root_part.as_os_str()))
        })
    }

    fn is_root(&self, path: &Path) -> bool {
        path.components().count() == self.root.components().count()
    }
}

impl Candidate {
    /// Applies the content type whitelist to the candidate's extension.
    pub fn check_extension(self, registry: &ContentTypeRegistry) -> Result<ResolvedPath, ResolveError> {
        let extension = match self.absolute_path.extension() {
            Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
            None => return Err(ResolveError::Forbidden(self.absolute_path)),
        };

        let content_type = match registry.lookup(&extension) {
            Some(mime) => mime.to_string(),
            None => return Err(ResolveError::Forbidden(self.absolute_path)),
        };

        Ok(ResolvedPath {
            absolute_path: self.absolute_path,
            url_path: self.url_path,
            extension,
            content_type,
        })
    }
}

/// Percent-decodes a request target.
///
/// A `%` not followed by two hex digits is rejected, as is a result that is
/// not UTF-8.
pub fn decode_target(target: &str) -> Result<String, ResolveError> {
    let bytes = target.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(ResolveError::MalformedEncoding(target.to_string()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(target)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ResolveError::MalformedEncoding(target.to_string()))
}

fn strip_query(path: &str) -> &str {
    match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    }
}

fn normalize_separators(path: &str) -> String {
    path.replace(['/', '\\'], MAIN_SEPARATOR_STR).trim().to_string()
}

/// Canonicalizes `path`, tolerating a missing tail.
///
/// The deepest existing ancestor is canonicalized (resolving links) and the
/// remaining components are appended unchanged, so a request for a missing
/// file still resolves and can be reported as not found.
async fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path;
    let mut missing: Vec<&OsStr> = Vec::new();

    loop {
        match fs::canonicalize(existing).await {
            Ok(mut canonical) => {
                for part in missing.iter().rev() {
                    canonical.push(part);
                }
                return Ok(canonical);
            }
            Err(e) => {
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(e);
                };
                missing.push(name);
                existing = parent;
            }
        }
    }
}

fn eq_ignore_case(a: &OsStr, b: &OsStr) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_escapes_are_rejected() {
        assert!(decode_target("/a%2").is_err());
        assert!(decode_target("/a%zz.html").is_err());
        assert!(decode_target("/%ff.html").is_err());
        assert_eq!(decode_target("/a%20b.html").unwrap(), "/a b.html");
    }

    #[test]
    fn query_is_dropped() {
        assert_eq!(strip_query("/index.html?v=2"), "/index.html");
        assert_eq!(strip_query("/index.html"), "/index.html");
    }

    #[test]
    fn separators_are_normalized() {
        let expected = format!("{0}a{0}b.css", MAIN_SEPARATOR);
        assert_eq!(normalize_separators(" /a\\b.css "), expected);
    }
}
