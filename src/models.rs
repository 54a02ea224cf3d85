// src/models.rs
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version of the persisted store blob. Bump when `Design` changes shape.
pub const PERSISTED_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignMetadata {
    pub title: String,
    pub description: String,
    /// Comma-separated keyword string, as produced by the AI gateway.
    pub tags: String,
    #[serde(rename = "type")]
    pub design_type: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub id: Uuid,
    pub metadata: DesignMetadata,
    /// Current displayable image: a data URL or a remote URL.
    pub image_url: String,
    /// The image produced at creation time. Never changes afterwards.
    pub original_image_url: String,
    /// The idea text this design was generated from. Immutable; remix reuses it.
    pub original_idea: String,
    pub bg_removed: bool,
    pub upscaled: bool,
    pub created_at: DateTime<Utc>,
}

impl Design {
    pub fn new(idea: &str, metadata: DesignMetadata, image_url: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata,
            original_image_url: image_url.clone(),
            image_url,
            original_idea: idea.to_string(),
            bg_removed: false,
            upscaled: false,
            created_at: Utc::now(),
        }
    }
}

/// What the AI gateway returns for one idea: an image prompt plus listing metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignBrief {
    pub image_prompt: String,
    pub metadata: DesignMetadata,
}

/// The durable blob stored under the fixed slot key.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    pub designs: Vec<Design>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintAspect {
    pub name: String,
    pub status: AspectStatus,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintReport {
    pub aspects: Vec<PrintAspect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspirationAnalysis {
    pub theme: String,
    pub style: String,
    pub colors: Vec<String>,
    #[serde(default)]
    pub detected_text: Option<String>,
    pub ideas: Vec<String>,
}

/// Outcome of analyzing one uploaded image. Transient; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
    pub print_report: PrintReport,
    pub inspiration: InspirationAnalysis,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub idea: String,
    pub error: String,
}

/// Result of a bulk generation run: per-idea failures are collected, never fatal.
#[derive(Debug, Serialize)]
pub struct BulkReport {
    pub designs: Vec<Design>,
    pub failures: Vec<BulkFailure>,
    pub persisted: bool,
}

pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Splits a data URL into its payload bytes. Returns None for remote URLs or
/// malformed data URLs.
pub fn from_data_url(url: &str) -> Option<Vec<u8>> {
    let rest = url.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    general_purpose::STANDARD.decode(payload).ok()
}
