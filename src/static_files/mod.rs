//! Static file serving
//!
//! This module owns the document root: resolving request targets safely,
//! checking files exist, and loading them for the connection to send.

pub mod resolver;

pub use resolver::{Candidate, PathResolver, ResolveError, ResolvedPath};

use std::io;
use tokio::fs;

use crate::config::StaticFilesConfig;
use crate::http::mime::ContentTypeRegistry;
use crate::http::response::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("no file at {0}")]
    NotFound(String),

    #[error("failed to access {path}: {source}")]
    Io { path: String, source: io::Error },
}

impl FileError {
    pub fn status(&self) -> StatusCode {
        match self {
            FileError::NotFound(_) => StatusCode::NotFound,
            FileError::Io { .. } => StatusCode::InternalServerError,
        }
    }

    fn from_io(resolved: &ResolvedPath, e: io::Error) -> Self {
        let path = resolved.absolute_path.display().to_string();
        match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => FileError::NotFound(path),
            _ => FileError::Io { path, source: e },
        }
    }
}

/// Read-only state shared by every connection.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    resolver: PathResolver,
    registry: ContentTypeRegistry,
}

impl StaticFiles {
    pub fn new(resolver: PathResolver, registry: ContentTypeRegistry) -> Self {
        Self { resolver, registry }
    }

    /// Builds the resolver and registry from a finalized config.
    pub fn from_config(cfg: &StaticFilesConfig) -> Self {
        let mut registry = ContentTypeRegistry::new();
        registry.extend(&cfg.content_types);
        Self::new(PathResolver::from_config(cfg), registry)
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub async fn locate(&self, target: &str) -> Result<Candidate, ResolveError> {
        self.resolver.locate(target).await
    }

    pub fn check_extension(&self, candidate: Candidate) -> Result<ResolvedPath, ResolveError> {
        candidate.check_extension(&self.registry)
    }

    pub async fn resolve(&self, target: &str) -> Result<ResolvedPath, ResolveError> {
        self.resolver.resolve(target, &self.registry).await
    }

    /// Verifies a regular file exists at the resolved path.
    pub async fn check_exists(&self, resolved: &ResolvedPath) -> Result<(), FileError> {
        match fs::metadata(&resolved.absolute_path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(FileError::NotFound(resolved.absolute_path.display().to_string())),
            Err(e) => Err(FileError::from_io(resolved, e)),
        }
    }

    /// Reads the whole file into memory.
    pub async fn read(&self, resolved: &ResolvedPath) -> Result<Vec<u8>, FileError> {
        fs::read(&resolved.absolute_path)
            .await
            .map_err(|e| FileError::from_io(resolved, e))
    }
}
