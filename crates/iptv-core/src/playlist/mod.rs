mod input;
mod parser;

pub use input::{PlaylistContent, PlaylistInput, PlaylistResolver};
pub use parser::{parse, write_m3u};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One stream line of a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// `key="value"` pairs from the `#EXTINF` line, e.g. `tvg-id` or `group-title`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// The `#EXTINF` line exactly as read, kept so entries can be written back out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extinf: Option<String>,
}

impl Entry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: None,
            attributes: BTreeMap::new(),
            extinf: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Name for display: the `#EXTINF` title, then `tvg-name`, then the URL.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or_else(|| self.attribute("tvg-name"))
            .unwrap_or(&self.url)
    }
}
