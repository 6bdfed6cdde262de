//! Shared fixtures for integration tests

#![allow(dead_code)]

use staticd::config::Config;
use staticd::static_files::StaticFiles;
use std::sync::Arc;
use tempfile::TempDir;

pub const INDEX_HTML: &str = "<html><body>home</body></html>";
pub const STYLE_CSS: &str = "body { color: red; }";
pub const APP_JS: &str = "console.log('app');";

/// A document root with a few servable files and one that is not.
pub fn docroot() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::write(dir.path().join("style.css"), STYLE_CSS).unwrap();
    std::fs::write(dir.path().join("data.json"), "{\"a\": 1}").unwrap();
    std::fs::write(dir.path().join("README"), "plain").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub").join("app.js"), APP_JS).unwrap();
    dir
}

pub fn config(dir: &TempDir) -> Config {
    let mut cfg = Config::new(0, dir.path()).unwrap();
    cfg.server.host = "127.0.0.1".to_string();
    cfg
}

pub fn static_files(dir: &TempDir) -> Arc<StaticFiles> {
    Arc::new(StaticFiles::from_config(&config(dir).static_files))
}

pub struct ParsedResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ParsedResponse {
    pub fn status(&self) -> u16 {
        self.status_line
            .split(' ')
            .nth(1)
            .and_then(|code| code.parse().ok())
            .unwrap()
    }

    pub fn version(&self) -> &str {
        self.status_line.split(' ').next().unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub fn parse_response(raw: &[u8]) -> ParsedResponse {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator");
    let head = std::str::from_utf8(&raw[..end]).unwrap();
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap().to_string();
    let headers = lines
        .map(|line| {
            let (k, v) = line.split_once(": ").unwrap();
            (k.to_string(), v.to_string())
        })
        .collect();

    ParsedResponse {
        status_line,
        headers,
        body: raw[end + 4..].to_vec(),
    }
}
