pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::assessment::handlers;
use crate::state::AppState;
use crate::voice::handlers as audio;

/// Uploads (CV documents, answer recordings) are capped at 10 MiB.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Assessment API
        .route("/api/v1/assessments", post(handlers::handle_start_assessment))
        .route(
            "/api/v1/assessments/:id",
            get(handlers::handle_session_status),
        )
        .route(
            "/api/v1/assessments/:id/analyze",
            post(handlers::handle_analyze),
        )
        .route(
            "/api/v1/assessments/:id/answers",
            post(handlers::handle_submit_answer),
        )
        .route(
            "/api/v1/assessments/:id/report",
            post(handlers::handle_finalize),
        )
        .route("/api/v1/reports/:id", get(handlers::handle_download_report))
        // Audio API
        .route("/api/v1/audio/synthesize", post(audio::handle_synthesize))
        .route("/api/v1/audio/transcribe", post(audio::handle_transcribe))
        .route("/api/v1/audio/:id", get(audio::handle_serve_audio))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
