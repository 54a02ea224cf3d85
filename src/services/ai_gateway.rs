// src/services/ai_gateway.rs
use crate::errors::StudioError;
use crate::models::{DesignBrief, InspirationAnalysis, PrintAspect};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Generative text/image operations the lifecycle core depends on.
#[async_trait]
pub trait GenerativeGateway: Send + Sync {
    async fn suggest_ideas(&self, count: usize) -> Result<Vec<String>, StudioError>;
    async fn design_brief(&self, idea: &str) -> Result<DesignBrief, StudioError>;
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, StudioError>;
    async fn inspiration(&self, image: &[u8]) -> Result<InspirationAnalysis, StudioError>;
    async fn print_readiness(
        &self,
        image: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<PrintAspect>, StudioError>;
    async fn upscale(&self, image: &[u8]) -> Result<Vec<u8>, StudioError>;
}

pub struct AiGateway {
    openai_key: String,
    stability_key: Option<String>,
    client: Client,
}

impl AiGateway {
    pub fn new(openai_key: String, stability_key: Option<String>) -> Result<Self, StudioError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StudioError::Configuration(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            openai_key,
            stability_key,
            client,
        })
    }

    /// Sends a chat completion in JSON mode and returns the parsed content
    /// object. `image` attaches the bytes as a vision input.
    async fn chat_json(
        &self,
        prompt: &str,
        image: Option<&[u8]>,
    ) -> Result<serde_json::Value, StudioError> {
        let content = match image {
            Some(bytes) => {
                let base64_image = general_purpose::STANDARD.encode(bytes);
                json!([
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/png;base64,{}", base64_image)
                        }
                    }
                ])
            }
            None => json!(prompt),
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.openai_key))
            .json(&json!({
                "model": "gpt-4o",
                "messages": [{ "role": "user", "content": content }],
                "max_tokens": 4096,
                "response_format": { "type": "json_object" }
            }))
            .send()
            .await
            .map_err(|e| StudioError::Gateway(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StudioError::Gateway(format!("OpenAI error: {}", error_text)));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StudioError::Gateway(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| StudioError::Gateway("No content in OpenAI response".to_string()))?;

        serde_json::from_str(content)
            .map_err(|e| StudioError::Gateway(format!("Gateway returned malformed JSON: {}", e)))
    }
}

#[async_trait]
impl GenerativeGateway for AiGateway {
    async fn suggest_ideas(&self, count: usize) -> Result<Vec<String>, StudioError> {
        let prompt = format!(
            r#"Suggest {} fresh, sellable t-shirt design ideas. Each idea is one short
sentence a designer could act on directly. Vary theme and audience.

Return as JSON: {{ "ideas": ["...", ...] }}"#,
            count
        );

        let data = self.chat_json(&prompt, None).await?;
        serde_json::from_value(data["ideas"].clone())
            .map_err(|e| StudioError::Gateway(format!("Malformed idea list: {}", e)))
    }

    async fn design_brief(&self, idea: &str) -> Result<DesignBrief, StudioError> {
        let prompt = format!(
            r#"You are preparing a print-on-demand t-shirt design from this idea:

{}

Produce:
1. IMAGE PROMPT: a detailed generation prompt for the artwork itself —
   subject, style, composition, palette. Artwork only, no shirt mockup,
   no photographic background.
2. LISTING METADATA: title (catchy, under 60 chars), description (2-3
   sentences), tags (comma-separated keywords), type (e.g. illustration,
   typography, vintage), color (best shirt color for the artwork).

Return as JSON:
{{
    "image_prompt": "...",
    "metadata": {{ "title": "...", "description": "...", "tags": "...", "type": "...", "color": "..." }}
}}"#,
            idea
        );

        let data = self.chat_json(&prompt, None).await?;
        serde_json::from_value(data)
            .map_err(|e| StudioError::Gateway(format!("Malformed design brief: {}", e)))
    }

    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, StudioError> {
        let response = self
            .client
            .post("https://api.openai.com/v1/images/generations")
            .header("Authorization", format!("Bearer {}", self.openai_key))
            .json(&json!({
                "model": "dall-e-3",
                "prompt": prompt,
                "n": 1,
                "size": "1024x1024",
                "quality": "hd",
                "response_format": "b64_json"
            }))
            .send()
            .await
            .map_err(|e| StudioError::Gateway(format!("Image generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StudioError::Gateway(format!(
                "Image generation error: {}",
                error_text
            )));
        }

        let result: serde_json::Value = response.json().await.map_err(|e| {
            StudioError::Gateway(format!("Failed to parse generation response: {}", e))
        })?;

        let b64_json = result["data"][0]["b64_json"]
            .as_str()
            .ok_or_else(|| StudioError::Gateway("No image data in response".to_string()))?;

        general_purpose::STANDARD
            .decode(b64_json)
            .map_err(|e| StudioError::Gateway(format!("Failed to decode image: {}", e)))
    }

    async fn inspiration(&self, image: &[u8]) -> Result<InspirationAnalysis, StudioError> {
        let prompt = r##"Analyze this image as inspiration for new t-shirt designs. Provide:

1. THEME: the subject matter in a few words.
2. STYLE: the visual style (art movement, technique, rendering).
3. COLORS: the dominant colors as hex codes.
4. DETECTED TEXT: any legible text in the image, or null.
5. IDEAS: 3-5 new design ideas derived from this image, each one sentence.

Return as JSON:
{
    "theme": "...",
    "style": "...",
    "colors": ["#..."],
    "detected_text": null,
    "ideas": ["...", ...]
}"##;

        let data = self.chat_json(prompt, Some(image)).await?;
        serde_json::from_value(data)
            .map_err(|e| StudioError::Gateway(format!("Malformed inspiration analysis: {}", e)))
    }

    async fn print_readiness(
        &self,
        image: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<PrintAspect>, StudioError> {
        let prompt = format!(
            r#"Assess this {}x{} image for direct-to-garment printing. Report on exactly
these four aspects, in this order:

1. "background": is the background transparent or printable as-is?
2. "contrast": will the artwork hold up on both light and dark garments?
3. "detail": are fine details thick enough to survive printing?
4. "edges": are the artwork edges clean, without halos or fringing?

Each aspect gets a status of "pass", "warn" or "fail", a one-sentence
details field, and an optional suggestion when status is not "pass".

Return as JSON:
{{
    "aspects": [
        {{ "name": "...", "status": "pass", "details": "...", "suggestion": null }},
        ...
    ]
}}"#,
            width, height
        );

        let data = self.chat_json(&prompt, Some(image)).await?;
        serde_json::from_value(data["aspects"].clone())
            .map_err(|e| StudioError::Gateway(format!("Malformed print report: {}", e)))
    }

    async fn upscale(&self, image: &[u8]) -> Result<Vec<u8>, StudioError> {
        let api_key = self.stability_key.as_ref().ok_or_else(|| {
            StudioError::Configuration("STABILITY_API_KEY not configured".to_string())
        })?;

        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("design.png")
            .mime_str("image/png")
            .map_err(|e| StudioError::Gateway(format!("Invalid upload part: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("output_format", "png");

        let response = self
            .client
            .post("https://api.stability.ai/v2beta/stable-image/upscale/fast")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Accept", "image/*")
            .multipart(form)
            .send()
            .await
            .map_err(|e| StudioError::Gateway(format!("Upscale request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StudioError::Gateway(format!("Upscale error: {}", error_text)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StudioError::Gateway(format!("Failed to read upscaled image: {}", e)))?;

        Ok(bytes.to_vec())
    }
}
