use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::routes::{checks, jobs};
use crate::state::AppState;

/// Raw playlists are posted inline and routinely exceed axum's 2 MiB default.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub fn build_app(state: AppState) -> Router {
    let api_v1 = Router::new().merge(checks::router()).merge(jobs::router());

    Router::new()
        .nest("/api/v1", api_v1)
        .route("/metrics", get(metrics_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
