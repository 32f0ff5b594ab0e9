/// Client for the external media-upload collaborator.
///
/// Registration hands local file references here and gets back the stable
/// URL stored on the account. The collaborator's internals (storage,
/// transcoding) are out of scope.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Clone)]
pub struct MediaClient {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct UploadRequest {
    file: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

impl MediaClient {
    pub fn new(base_url: String, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    /// Upload a local file reference; returns the stable media URL.
    ///
    /// # Errors
    /// BadRequest for a blank reference, Internal when the collaborator is
    /// unreachable or answers with an error status.
    pub async fn upload(&self, file_ref: &str) -> Result<String, AppError> {
        if file_ref.trim().is_empty() {
            return Err(AppError::BadRequest("file reference is required".to_string()));
        }

        let url = format!("{}/upload", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&UploadRequest {
                file: file_ref.to_string(),
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Media upload request failed: {}", e);
                AppError::Internal(format!("Media upload failed: {}", e))
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Media service returned error: {}", e);
                AppError::Internal(format!("Media service error: {}", e))
            })?;

        let uploaded: UploadResponse = response.json().await.map_err(|e| {
            tracing::error!("Media service returned malformed body: {}", e);
            AppError::Internal(format!("Media service error: {}", e))
        })?;

        Ok(uploaded.url)
    }
}
