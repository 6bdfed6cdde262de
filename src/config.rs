//! Server configuration
//!
//! Configuration is read from an optional YAML file named by `STATICD_CONFIG`,
//! then `PORT` and `WEBROOT` override the listen port and document root.
//! Every field has a default, so an empty environment yields a usable config
//! as long as the default document root exists.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "STATICD_CONFIG";
/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";
/// Environment variable overriding `static_files.document_root`.
pub const WEBROOT_ENV: &str = "WEBROOT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

/// Listener and connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (e.g., "0.0.0.0")
    pub host: String,

    /// Port to bind; 0 lets the OS pick one
    pub port: u16,

    /// Deadline for receiving the complete request head, in seconds
    pub read_timeout_secs: u64,

    /// Upper bound on buffered request-head bytes
    pub max_request_bytes: usize,

    /// Maximum number of connections handled at once; unbounded when unset
    pub max_connections: Option<usize>,
}

/// Document root and content type settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory below which every served file must reside
    pub document_root: PathBuf,

    /// File served for a request to `/`
    pub default_document: String,

    /// Compare paths case-insensitively during the containment check
    pub case_insensitive_paths: bool,

    /// Extra extension to MIME type entries (e.g., ".svg": "image/svg+xml")
    pub content_types: BTreeMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout_secs: 5,
            max_request_bytes: 64 * 1024,
            max_connections: None,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            document_root: PathBuf::from("./webroot"),
            default_document: "index.html".to_string(),
            case_insensitive_paths: cfg!(any(windows, target_os = "macos")),
            content_types: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// The `host:port` string handed to the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` in place of the process environment.
    ///
    /// The returned config is already finalized: the document root is
    /// canonical and known to be a directory.
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(port) = lookup(PORT_ENV) {
            cfg.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid {} value {:?}", PORT_ENV, port))?;
        }

        if let Some(root) = lookup(WEBROOT_ENV) {
            cfg.static_files.document_root = PathBuf::from(root);
        }

        cfg.finalize()
    }

    /// Reads and parses a YAML config file without finalizing it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(content)?;
        Ok(cfg)
    }

    /// Builds a finalized config serving `document_root` on `port`.
    pub fn new(port: u16, document_root: impl Into<PathBuf>) -> Result<Self> {
        let mut cfg = Self::default();
        cfg.server.port = port;
        cfg.static_files.document_root = document_root.into();
        cfg.finalize()
    }

    /// Canonicalizes the document root and normalizes content type keys.
    pub fn finalize(mut self) -> Result<Self> {
        let root = &self.static_files.document_root;
        let canonical = std::fs::canonicalize(root)
            .with_context(|| format!("document root {} is not accessible", root.display()))?;

        if !canonical.is_dir() {
            anyhow::bail!("document root {} is not a directory", canonical.display());
        }

        if self.static_files.default_document.trim().is_empty() {
            anyhow::bail!("default_document must not be empty");
        }

        self.static_files.document_root = canonical;
        self.static_files.content_types = self
            .static_files
            .content_types
            .into_iter()
            .map(|(ext, mime)| (normalize_extension(&ext), mime))
            .collect();

        Ok(self)
    }
}

/// Lower-cases an extension and ensures it carries a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}
