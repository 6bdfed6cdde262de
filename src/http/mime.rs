//! Extension to content type mapping.
//!
//! The registry doubles as the whitelist of servable files: an extension
//! without an entry is refused, never served as a generic type.

use std::collections::HashMap;

use crate::config::normalize_extension;

const DEFAULT_TYPES: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".css", "text/css"),
    (".js", "application/javascript"),
];

#[derive(Debug, Clone)]
pub struct ContentTypeRegistry {
    types: HashMap<String, String>,
}

impl ContentTypeRegistry {
    /// The built-in whitelist: `.html`, `.css` and `.js`.
    pub fn new() -> Self {
        let types = DEFAULT_TYPES
            .iter()
            .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
            .collect();
        Self { types }
    }

    /// Adds or replaces an entry. The extension is lower-cased and given a
    /// leading dot if it lacks one.
    pub fn with(mut self, ext: &str, mime: impl Into<String>) -> Self {
        self.types.insert(normalize_extension(ext), mime.into());
        self
    }

    /// Looks up the MIME type for an extension such as `".css"`.
    ///
    /// The lookup is case-insensitive.
    pub fn lookup(&self, ext: &str) -> Option<&str> {
        if ext.is_empty() {
            return None;
        }
        self.types
            .get(&normalize_extension(ext))
            .map(|m| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for ContentTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Extend<(&'a String, &'a String)> for ContentTypeRegistry {
    fn extend<I: IntoIterator<Item = (&'a String, &'a String)>>(&mut self, iter: I) {
        for (ext, mime) in iter {
            self.types.insert(normalize_extension(ext), mime.clone());
        }
    }
}
