//! Image host client.
//!
//! Policy cover images, profile photos, and claim documents are held by an
//! external image host; the portal uploads on the user's behalf and stores
//! only the resulting URL in the backend.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::ImageHostConfig;

/// Largest upload the portal will forward, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Errors that can occur when uploading an image.
#[derive(Debug, Error)]
pub enum UploadError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The upload was empty or too large.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// Image host rejected the upload.
    #[error("image host rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

/// Client for the image host upload endpoint.
#[derive(Clone)]
pub struct ImageHostClient {
    inner: Arc<ImageHostClientInner>,
}

struct ImageHostClientInner {
    client: reqwest::Client,
    upload_url: String,
    api_key: SecretString,
}

impl ImageHostClient {
    /// Create a new image host client.
    #[must_use]
    pub fn new(config: &ImageHostConfig) -> Self {
        Self {
            inner: Arc::new(ImageHostClientInner {
                client: reqwest::Client::new(),
                upload_url: config.upload_url.clone(),
                api_key: config.api_key.clone(),
            }),
        }
    }

    /// Upload image bytes and return the hosted URL.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidUpload` for empty or oversized files,
    /// `UploadError::Rejected` if the host declines, or a transport error.
    #[instrument(skip(self, bytes), fields(filename = %filename, size = bytes.len()))]
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<String, UploadError> {
        validate_upload(&bytes)?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .inner
            .client
            .post(&self.inner.upload_url)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        let parsed: UploadResponse = serde_json::from_str(&text)?;
        match parsed.data {
            Some(data) if parsed.success => Ok(data.url),
            _ => Err(UploadError::Rejected {
                status: status.as_u16(),
                message: "host reported failure without an error status".to_string(),
            }),
        }
    }
}

fn validate_upload(bytes: &[u8]) -> Result<(), UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::InvalidUpload("empty file".to_string()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::InvalidUpload(format!(
            "file exceeds {MAX_UPLOAD_BYTES} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_upload_rejects_empty() {
        assert!(matches!(
            validate_upload(&[]),
            Err(UploadError::InvalidUpload(_))
        ));
    }

    #[test]
    fn test_validate_upload_rejects_oversized() {
        let bytes = vec![0u8; MAX_UPLOAD_BYTES + 1];
        assert!(matches!(
            validate_upload(&bytes),
            Err(UploadError::InvalidUpload(_))
        ));
    }

    #[test]
    fn test_validate_upload_accepts_normal_file() {
        assert!(validate_upload(&[0u8; 1024]).is_ok());
    }

    #[test]
    fn test_upload_response_parses_host_json() {
        let parsed: UploadResponse = serde_json::from_str(
            r#"{"success": true, "data": {"url": "https://i.ibb.co/abc/photo.png"}}"#,
        )
        .unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.data.unwrap().url, "https://i.ibb.co/abc/photo.png");
    }
}
