use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use iptv_core::CheckError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Check(#[from] CheckError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Check(e) => {
                let status = match e {
                    CheckError::PlaylistNotFound { .. } => StatusCode::NOT_FOUND,
                    CheckError::Fetch { .. } => StatusCode::BAD_GATEWAY,
                    CheckError::UnsupportedInputType(_)
                    | CheckError::NotAPlaylist { .. }
                    | CheckError::InvalidPlaylistFormat(_) => StatusCode::BAD_REQUEST,
                };
                (status, e.kind())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_kind) = self.parts();
        let body = ErrorBody {
            error: error_kind.to_string(),
            message: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
