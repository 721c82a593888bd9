pub mod checks;
pub mod jobs;

use serde::Deserialize;
use serde_json::Value;

use iptv_core::{CheckOptions, PlaylistInput};

use crate::error::ApiError;
use crate::state::AppState;

/// Body shared by the synchronous playlist check and background jobs.
///
/// `input` is a URL, raw playlist text, a server-side path (when enabled) or an
/// array of bytes.
#[derive(Debug, Deserialize)]
pub struct PlaylistCheckRequest {
    pub input: Value,
    pub timeout: Option<u64>,
    pub parallel: Option<usize>,
}

impl PlaylistCheckRequest {
    pub fn options(&self) -> CheckOptions {
        let mut options = CheckOptions::default();
        if let Some(ms) = self.timeout {
            options = options.with_timeout(ms);
        }
        if let Some(p) = self.parallel {
            options = options.with_parallel(p);
        }
        options
    }

    pub fn playlist_input(&self, state: &AppState) -> Result<PlaylistInput, ApiError> {
        let input = PlaylistInput::from_json(&self.input)?;
        if matches!(input, PlaylistInput::Path(_)) && !state.allow_local_paths {
            return Err(ApiError::BadRequest(
                "Local playlist paths are disabled on this server".into(),
            ));
        }
        Ok(input)
    }
}

pub(crate) fn is_valid_url(s: &str) -> bool {
    url::Url::parse(s)
        .map(|u| u.scheme() == "http" || u.scheme() == "https")
        .unwrap_or(false)
}
