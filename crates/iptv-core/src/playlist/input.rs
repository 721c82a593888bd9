use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::{parse, Entry};
use crate::error::CheckError;

/// Anything a playlist can be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistInput {
    Url(String),
    Path(PathBuf),
    Text(String),
    Bytes(Vec<u8>),
}

impl PlaylistInput {
    /// Decides what a caller-supplied string refers to.
    pub fn detect(input: &str) -> Self {
        let trimmed = input.trim();
        let lower = trimmed.get(..8).unwrap_or(trimmed).to_ascii_lowercase();
        let looks_like_url = lower.starts_with("http://") || lower.starts_with("https://");

        if looks_like_url && !trimmed.contains('\n') {
            Self::Url(trimmed.to_string())
        } else if input.contains("#EXTM3U") || input.contains('\n') {
            Self::Text(input.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }

    /// Accepts a JSON string (detected like [`PlaylistInput::detect`]) or an array of bytes.
    pub fn from_json(value: &Value) -> Result<Self, CheckError> {
        match value {
            Value::String(s) => Ok(Self::detect(s)),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Self::Bytes)
                .ok_or_else(|| CheckError::UnsupportedInputType("array of non-byte values".into())),
            other => Err(CheckError::UnsupportedInputType(json_type_name(other).into())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Path(_) => "path",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<&str> for PlaylistInput {
    fn from(s: &str) -> Self {
        Self::detect(s)
    }
}

impl From<String> for PlaylistInput {
    fn from(s: String) -> Self {
        Self::detect(&s)
    }
}

impl From<PathBuf> for PlaylistInput {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<&Path> for PlaylistInput {
    fn from(p: &Path) -> Self {
        Self::Path(p.to_path_buf())
    }
}

impl From<Vec<u8>> for PlaylistInput {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

/// Playlist text together with where it came from.
#[derive(Debug, Clone)]
pub struct PlaylistContent {
    pub text: String,
    pub source_url: Option<String>,
}

impl PlaylistContent {
    /// Parses the text. Fetched content that is not a playlist gets its own error.
    pub fn parse(&self) -> Result<Vec<Entry>, CheckError> {
        parse(&self.text).map_err(|e| match &self.source_url {
            Some(url) => CheckError::NotAPlaylist { url: url.clone() },
            None => e,
        })
    }
}

/// Turns a [`PlaylistInput`] into playlist text.
#[derive(Debug, Clone)]
pub struct PlaylistResolver {
    client: Client,
    timeout: Duration,
}

impl PlaylistResolver {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn resolve(&self, input: &PlaylistInput) -> Result<PlaylistContent, CheckError> {
        let text = match input {
            PlaylistInput::Url(url) => {
                let text = self.fetch(url).await?;
                return Ok(PlaylistContent {
                    text,
                    source_url: Some(url.clone()),
                });
            }
            PlaylistInput::Path(path) => read_file(path).await?,
            PlaylistInput::Text(text) => text.clone(),
            PlaylistInput::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        };
        Ok(PlaylistContent {
            text,
            source_url: None,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, CheckError> {
        debug!(url, "Fetching playlist");
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "Playlist fetch failed");
                CheckError::Fetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                    status: None,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Playlist fetch returned error status");
            return Err(CheckError::Fetch {
                url: url.to_string(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                status: Some(status.as_u16()),
            });
        }

        response.text().await.map_err(|e| CheckError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
            status: Some(status.as_u16()),
        })
    }
}

async fn read_file(path: &Path) -> Result<String, CheckError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CheckError::PlaylistNotFound {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
