use thiserror::Error;

/// Failures that reject a whole check call. Dead endpoints are never reported here;
/// they are part of the result.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Unsupported input type: {0}")]
    UnsupportedInputType(String),
    #[error("Playlist is not valid: {path} ({reason})")]
    PlaylistNotFound { path: String, reason: String },
    #[error("Error fetching playlist {url}: {reason}")]
    Fetch {
        url: String,
        reason: String,
        status: Option<u16>,
    },
    #[error("URL is not an .m3u playlist file: {url}")]
    NotAPlaylist { url: String },
    #[error("Playlist is not valid: {0}")]
    InvalidPlaylistFormat(String),
}

impl CheckError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => *status,
            _ => None,
        }
    }

    /// Stable machine-readable name, used by the API and in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedInputType(_) => "unsupported_input_type",
            Self::PlaylistNotFound { .. } => "playlist_not_found",
            Self::Fetch { .. } => "fetch_error",
            Self::NotAPlaylist { .. } | Self::InvalidPlaylistFormat(_) => "invalid_playlist_format",
        }
    }
}
