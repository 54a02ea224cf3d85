// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Image processing error: {0}")]
    Image(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ResponseError for StudioError {
    fn error_response(&self) -> HttpResponse {
        match self {
            StudioError::Configuration(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Configuration error",
                    "message": self.to_string()
                }))
            }
            StudioError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            StudioError::Gateway(_) => {
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "AI service error",
                    "message": self.to_string()
                }))
            }
            StudioError::Storage(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Storage error",
                "message": self.to_string()
            })),
            StudioError::Image(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Image processing error",
                "message": self.to_string()
            })),
            StudioError::NotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "Not found",
                "message": self.to_string()
            })),
        }
    }
}
