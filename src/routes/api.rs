use crate::{handlers::{delete_image, diagnostics, health_check, image_exists, ready_check, upload_image}, AppState};
use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use std::sync::Arc;

const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Create API routes
pub fn create_api_routes(app_state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/images/:session_id/:story_id/:slide/:filename", post(upload_image).delete(delete_image))
        .route("/v1/images/:session_id/:story_id/:slide/:filename/exists", get(image_exists))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
        .with_state(app_state)
}
