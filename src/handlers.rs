// src/handlers.rs
use crate::overlay::{self, TextOverlay};
use crate::{errors::StudioError, export, models::Design, AppState};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub idea: String,
}

#[derive(Deserialize)]
pub struct BulkRequest {
    pub ideas: Vec<String>,
}

#[derive(Deserialize)]
pub struct IdeasQuery {
    pub count: Option<usize>,
}

#[derive(Deserialize)]
pub struct ClearQuery {
    pub confirm: Option<bool>,
}

/// Mutation responses carry the design plus a warning when the durable
/// mirror write failed: the design exists but may not survive a reload.
fn design_response(design: Design, persisted: bool) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "design": design,
        "persisted": persisted,
        "warning": if persisted {
            None
        } else {
            Some("Design saved in memory only; it may not survive a restart")
        }
    }))
}

pub async fn suggest_ideas(
    query: web::Query<IdeasQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let ideas = data.lifecycle.suggest_ideas(query.count.unwrap_or(5)).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ideas": ideas })))
}

pub async fn generate_design(
    body: web::Json<GenerateRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let (design, persisted) = data.lifecycle.generate_design(&body.idea).await?;
    Ok(design_response(design, persisted))
}

pub async fn generate_bulk(
    body: web::Json<BulkRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let report = data.lifecycle.generate_bulk(&body.ideas).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn list_designs(data: web::Data<AppState>) -> Result<HttpResponse, StudioError> {
    Ok(HttpResponse::Ok().json(data.lifecycle.designs().await))
}

pub async fn remove_background(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let (design, persisted) = data.lifecycle.remove_background(path.into_inner()).await?;
    Ok(design_response(design, persisted))
}

pub async fn upscale(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let (design, persisted) = data.lifecycle.upscale(path.into_inner()).await?;
    Ok(design_response(design, persisted))
}

pub async fn revert(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let (design, persisted) = data.lifecycle.revert(path.into_inner()).await?;
    Ok(design_response(design, persisted))
}

pub async fn remix(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let (design, persisted) = data.lifecycle.remix(path.into_inner()).await?;
    Ok(design_response(design, persisted))
}

/// Flattens a text label onto the design's current image and saves the result
/// as its new current image.
pub async fn apply_overlay(
    path: web::Path<Uuid>,
    body: web::Json<TextOverlay>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    let id = path.into_inner();
    let label = body.into_inner();
    label.validate()?;

    let base = data.lifecycle.current_image(id).await?;
    let font = overlay::load_font(&data.fonts_dir, label.font_family.as_deref())?;
    let edited = overlay::composite(&base, &label, &font)?;

    let (design, persisted) = data.lifecycle.save_edited_image(id, &edited).await?;
    Ok(design_response(design, persisted))
}

/// Destructive; the caller must pass confirm=true.
pub async fn clear_designs(
    query: web::Query<ClearQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    if query.confirm != Some(true) {
        return Err(StudioError::Validation(
            "Clearing all designs requires confirm=true".to_string(),
        ));
    }
    let persisted = data.lifecycle.clear().await;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "cleared": true,
        "persisted": persisted
    })))
}

pub async fn analyze_upload(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StudioError> {
    // First file field wins; the analysis looks at one image per upload.
    let mut image_data = Vec::new();
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| StudioError::Validation(format!("Upload error: {}", e)))?
    {
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| StudioError::Validation(format!("Upload error: {}", e)))?
        {
            image_data.extend_from_slice(&chunk);
        }
        if !image_data.is_empty() {
            break;
        }
    }

    let result = data.lifecycle.analyze_upload(&image_data).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn latest_analysis(data: web::Data<AppState>) -> Result<HttpResponse, StudioError> {
    match data.lifecycle.latest_analysis().await {
        Some(result) => Ok(HttpResponse::Ok().json(result)),
        None => Err(StudioError::NotFound("No analysis yet".to_string())),
    }
}

pub async fn export_images(data: web::Data<AppState>) -> Result<HttpResponse, StudioError> {
    let designs = data.lifecycle.designs().await;
    let bytes = export::package_images(&data.images, &designs).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"designs.zip\"",
        ))
        .body(bytes))
}

pub async fn export_metadata(data: web::Data<AppState>) -> Result<HttpResponse, StudioError> {
    let designs = data.lifecycle.designs().await;
    let bytes = export::metadata_workbook(&designs)?;
    Ok(HttpResponse::Ok()
        .content_type("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"designs.xlsx\"",
        ))
        .body(bytes))
}
