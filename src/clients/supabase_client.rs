use futures_util::future::BoxFuture;
use reqwest::{Client, StatusCode};
use tracing::{error, info};
use url::Url;

use crate::services::{BlobError, BlobStore};

/// Supabase Storage REST client.
#[derive(Debug)]
pub struct SupabaseStorage {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, BlobError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        let base_url = Url::parse(base_url)?;
        info!("Supabase storage client configured for {}", base_url);
        Ok(Self { client, base_url, api_key })
    }

    /// `{base}/storage/v1/object[/prefix]/{bucket}/{key...}` with each segment escaped.
    fn object_url(&self, prefix: Option<&str>, bucket: &str, key: &str) -> Result<Url, BlobError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BlobError::InvalidKey(self.base_url.to_string()))?;
            segments.pop_if_empty().extend(["storage", "v1", "object"]);
            if let Some(prefix) = prefix {
                segments.push(prefix);
            }
            segments.push(bucket);
            segments.extend(key.split('/'));
        }
        Ok(url)
    }
}

impl BlobStore for SupabaseStorage {
    fn upload<'a>(&'a self, bucket: &'a str, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<String, BlobError>> {
        Box::pin(async move {
            let url = self.object_url(None, bucket, key)?;
            let response = self
                .client
                .post(url)
                .bearer_auth(&self.api_key)
                .header("apikey", &self.api_key)
                .header("x-upsert", "true")
                .body(bytes)
                .send()
                .await?;
            if !response.status().is_success() {
                error!("Upload of {}/{} failed with status {}", bucket, key, response.status());
                return Err(BlobError::Rejected {
                    key: key.to_string(),
                    status: response.status().as_u16(),
                });
            }
            Ok(key.to_string())
        })
    }

    fn exists<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<bool, BlobError>> {
        Box::pin(async move {
            let url = self.object_url(Some("info"), bucket, key)?;
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.api_key)
                .header("apikey", &self.api_key)
                .send()
                .await?;
            match response.status() {
                status if status.is_success() => Ok(true),
                StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(false),
                status => Err(BlobError::Rejected {
                    key: key.to_string(),
                    status: status.as_u16(),
                }),
            }
        })
    }

    fn delete<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<bool, BlobError>> {
        Box::pin(async move {
            let url = self.object_url(None, bucket, key)?;
            let response = self
                .client
                .delete(url)
                .bearer_auth(&self.api_key)
                .header("apikey", &self.api_key)
                .send()
                .await?;
            match response.status() {
                status if status.is_success() => Ok(true),
                StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(false),
                status => {
                    error!("Delete of {}/{} failed with status {}", bucket, key, status);
                    Err(BlobError::Rejected {
                        key: key.to_string(),
                        status: status.as_u16(),
                    })
                }
            }
        })
    }

    fn public_url(&self, bucket: &str, key: &str) -> Option<String> {
        self.object_url(Some("public"), bucket, key).ok().map(String::from)
    }
}
