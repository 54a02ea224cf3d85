// src/services/bg_removal.rs
use crate::errors::StudioError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Background-removal gateway: image bytes in, image with transparent
/// background out.
#[async_trait]
pub trait MatteGateway: Send + Sync {
    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, StudioError>;
}

pub struct BgRemovalService {
    api_key: Option<String>,
    client: Client,
}

impl BgRemovalService {
    pub fn new(api_key: Option<String>) -> Result<Self, StudioError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StudioError::Configuration(format!("HTTP client init failed: {}", e)))?;

        Ok(Self { api_key, client })
    }
}

#[async_trait]
impl MatteGateway for BgRemovalService {
    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, StudioError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            StudioError::Configuration("REMOVEBG_API_KEY not configured".to_string())
        })?;

        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("design.png")
            .mime_str("image/png")
            .map_err(|e| StudioError::Gateway(format!("Invalid upload part: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("image_file", part)
            .text("size", "auto")
            .text("format", "png");

        let response = self
            .client
            .post("https://api.remove.bg/v1.0/removebg")
            .header("X-Api-Key", api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StudioError::Gateway(format!("Background removal request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StudioError::Gateway(format!(
                "Background removal error: {}",
                error_text
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            StudioError::Gateway(format!("Failed to read background-removed image: {}", e))
        })?;

        Ok(bytes.to_vec())
    }
}
