use crate::{
    models::{
        ErrorResponse, ImageAddedMessage, ImageDeleteResponse, ImageExistsResponse,
        ImageRemovedMessage, ImageUploadResponse, ServerMessage,
    },
    services::{image_key, BlobError},
    ws::RoomKey,
    AppState,
};
use axum::{body::Bytes, extract::{Path, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, error, info};

type ImagePath = Path<(String, String, u32, String)>;

fn blob_failure(e: BlobError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        BlobError::InvalidKey(_) => ErrorResponse::reply(StatusCode::BAD_REQUEST, e.to_string()),
        _ => {
            error!("Blob store failure: {}", e);
            ErrorResponse::reply(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// Tell everyone on the slide, if anyone is connected.
async fn notify_slide(app_state: &AppState, session_id: &str, story_id: &str, slide: u32, msg: ServerMessage) {
    let key = RoomKey::new(session_id, story_id, slide);
    match app_state.registry.get(&key).await {
        Some(room) => room.notify(msg).await,
        None => debug!("No open room {} for image event", key),
    }
}

/// Store an image for a slide
pub async fn upload_image(
    State(app_state): State<Arc<AppState>>,
    Path((session_id, story_id, slide, filename)): ImagePath,
    body: Bytes,
) -> Result<(StatusCode, Json<ImageUploadResponse>), (StatusCode, Json<ErrorResponse>)> {
    if body.is_empty() {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "Image body is empty"));
    }
    let key = image_key(&session_id, &story_id, slide, &filename).map_err(blob_failure)?;
    let bucket = &app_state.config.blob_bucket;

    let key = app_state
        .blob
        .upload(bucket, &key, body.to_vec())
        .await
        .map_err(blob_failure)?;
    info!("Stored image {} ({} bytes)", key, body.len());

    let public_url = app_state.blob.public_url(bucket, &key);
    let added = ServerMessage::ImageAdded(ImageAddedMessage {
        key: key.clone(),
        public_url: public_url.clone(),
    });
    notify_slide(&app_state, &session_id, &story_id, slide, added).await;
    Ok((StatusCode::CREATED, Json(ImageUploadResponse { key, public_url })))
}

/// Check whether an image exists for a slide
pub async fn image_exists(
    State(app_state): State<Arc<AppState>>,
    Path((session_id, story_id, slide, filename)): ImagePath,
) -> Result<Json<ImageExistsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let key = image_key(&session_id, &story_id, slide, &filename).map_err(blob_failure)?;
    let exists = app_state
        .blob
        .exists(&app_state.config.blob_bucket, &key)
        .await
        .map_err(blob_failure)?;
    Ok(Json(ImageExistsResponse { key, exists }))
}

/// Delete an image from a slide
pub async fn delete_image(
    State(app_state): State<Arc<AppState>>,
    Path((session_id, story_id, slide, filename)): ImagePath,
) -> Result<Json<ImageDeleteResponse>, (StatusCode, Json<ErrorResponse>)> {
    let key = image_key(&session_id, &story_id, slide, &filename).map_err(blob_failure)?;
    let deleted = app_state
        .blob
        .delete(&app_state.config.blob_bucket, &key)
        .await
        .map_err(blob_failure)?;
    if deleted {
        info!("Deleted image {}", key);
        let removed = ServerMessage::ImageRemoved(ImageRemovedMessage { key: key.clone() });
        notify_slide(&app_state, &session_id, &story_id, slide, removed).await;
    }
    Ok(Json(ImageDeleteResponse { key, deleted }))
}
