// src/services/image_processor.rs
use crate::errors::StudioError;
use crate::models::from_data_url;
use image::GenericImageView;
use reqwest::Client;
use std::time::Duration;

pub struct ImageProcessor {
    client: Client,
}

impl ImageProcessor {
    pub fn new() -> Result<Self, StudioError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StudioError::Configuration(format!("HTTP client init failed: {}", e)))?;

        Ok(Self { client })
    }

    pub fn dimensions(&self, data: &[u8]) -> Result<(u32, u32), StudioError> {
        let img = image::load_from_memory(data)
            .map_err(|e| StudioError::Image(format!("Invalid image format: {}", e)))?;

        Ok(img.dimensions())
    }

    /// Resolves a design's current image to raw bytes: data URLs decode
    /// locally, anything else is fetched over HTTP.
    pub async fn resolve(&self, url: &str) -> Result<Vec<u8>, StudioError> {
        if url.starts_with("data:") {
            return from_data_url(url)
                .ok_or_else(|| StudioError::Image("Malformed data URL".to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StudioError::Image(format!("Image fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StudioError::Image(format!(
                "Image fetch returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StudioError::Image(format!("Failed to read image body: {}", e)))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::to_data_url;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn dimensions_of_encoded_png() {
        let processor = ImageProcessor::new().unwrap();
        assert_eq!(processor.dimensions(&png_bytes(12, 7)).unwrap(), (12, 7));
    }

    #[test]
    fn dimensions_rejects_garbage() {
        let processor = ImageProcessor::new().unwrap();
        assert!(matches!(
            processor.dimensions(b"not an image"),
            Err(StudioError::Image(_))
        ));
    }

    #[tokio::test]
    async fn resolve_decodes_data_urls_without_network() {
        let processor = ImageProcessor::new().unwrap();
        let bytes = png_bytes(3, 3);
        let url = to_data_url(&bytes, "image/png");
        assert_eq!(processor.resolve(&url).await.unwrap(), bytes);
    }
}
