use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use iptv_core::{Report, StreamRequest, StreamStatus};

use super::{is_valid_url, PlaylistCheckRequest};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamCheckRequest {
    pub url: String,
    pub timeout: Option<u64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/streams/check", post(check_stream))
        .route("/playlists/check", post(check_playlist))
}

/// POST /api/v1/streams/check
async fn check_stream(
    State(state): State<AppState>,
    Json(body): Json<StreamCheckRequest>,
) -> Result<Json<StreamStatus>, ApiError> {
    if !is_valid_url(&body.url) {
        return Err(ApiError::BadRequest(format!("Invalid stream URL: {}", body.url)));
    }

    let mut request = StreamRequest::new(body.url);
    if let Some(ms) = body.timeout {
        request = request.with_timeout(ms);
    }

    let status = state.checker.check_stream(request).await;
    state.metrics.record_stream(&status);
    Ok(Json(status))
}

/// POST /api/v1/playlists/check
async fn check_playlist(
    State(state): State<AppState>,
    Json(body): Json<PlaylistCheckRequest>,
) -> Result<Json<Report>, ApiError> {
    let input = body.playlist_input(&state).inspect_err(|e| {
        if let ApiError::Check(e) = e {
            state.metrics.record_playlist_error(e);
        }
    })?;

    match state.checker.check_playlist(input, body.options()).await {
        Ok(report) => {
            state.metrics.record_report(&report);
            Ok(Json(report))
        }
        Err(e) => {
            state.metrics.record_playlist_error(&e);
            Err(e.into())
        }
    }
}
