use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for a stored slide image
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub key: String,
    pub public_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ImageExistsResponse {
    pub key: String,
    pub exists: bool,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ImageDeleteResponse {
    pub key: String,
    pub deleted: bool,
}
