use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Room, connection and lock counters
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Store an image for a slide
#[utoipa::path(
    post,
    path = "/api/v1/images/{session_id}/{story_id}/{slide}/{filename}",
    params(
        ("session_id" = String, Path, description = "Session code"),
        ("story_id" = String, Path, description = "Story id"),
        ("slide" = u32, Path, description = "Slide number"),
        ("filename" = String, Path, description = "Image file name")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Image stored", body = ImageUploadResponse),
        (status = 400, description = "Invalid key or empty body", body = ErrorResponse),
        (status = 502, description = "Storage backend failed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn upload_image_doc() {}

/// Check whether an image exists for a slide
#[utoipa::path(
    get,
    path = "/api/v1/images/{session_id}/{story_id}/{slide}/{filename}/exists",
    params(
        ("session_id" = String, Path, description = "Session code"),
        ("story_id" = String, Path, description = "Story id"),
        ("slide" = u32, Path, description = "Slide number"),
        ("filename" = String, Path, description = "Image file name")
    ),
    responses(
        (status = 200, description = "Existence check", body = ImageExistsResponse),
        (status = 400, description = "Invalid key", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn image_exists_doc() {}

/// Delete an image from a slide
#[utoipa::path(
    delete,
    path = "/api/v1/images/{session_id}/{story_id}/{slide}/{filename}",
    params(
        ("session_id" = String, Path, description = "Session code"),
        ("story_id" = String, Path, description = "Story id"),
        ("slide" = u32, Path, description = "Slide number"),
        ("filename" = String, Path, description = "Image file name")
    ),
    responses(
        (status = 200, description = "Delete outcome", body = ImageDeleteResponse),
        (status = 400, description = "Invalid key", body = ErrorResponse),
        (status = 502, description = "Storage backend failed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn delete_image_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        upload_image_doc,
        image_exists_doc,
        delete_image_doc,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse, ImageUploadResponse, ImageExistsResponse, ImageDeleteResponse, ErrorResponse, LockView)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
