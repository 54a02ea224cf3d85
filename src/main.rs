// src/main.rs
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

mod errors;
mod export;
mod handlers;
mod lifecycle;
mod models;
mod overlay;
mod services;

use crate::handlers::{
    analyze_upload, apply_overlay, clear_designs, export_images, export_metadata, generate_bulk,
    generate_design, latest_analysis, list_designs, remix, remove_background, revert,
    suggest_ideas, upscale,
};
use crate::lifecycle::DesignLifecycle;
use crate::services::{AiGateway, AssetStore, BgRemovalService, ImageProcessor, RedisBackend};

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<DesignLifecycle>,
    pub images: Arc<ImageProcessor>,
    pub fonts_dir: PathBuf,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Teesmith service...");

    // Initialize services
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let backend = RedisBackend::new(&redis_url)
        .await
        .expect("Redis connection failed");
    let store = Arc::new(AssetStore::open(Box::new(backend)).await);

    let gateway = Arc::new(
        AiGateway::new(
            std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set"),
            std::env::var("STABILITY_API_KEY").ok(),
        )
        .expect("AI gateway init failed"),
    );
    let matte = Arc::new(
        BgRemovalService::new(std::env::var("REMOVEBG_API_KEY").ok())
            .expect("Background-removal gateway init failed"),
    );
    let images = Arc::new(ImageProcessor::new().expect("Image processor init failed"));

    let lifecycle = Arc::new(DesignLifecycle::new(store, gateway, matte, images.clone()));

    let fonts_dir = PathBuf::from(
        std::env::var("FONTS_DIR")
            .unwrap_or_else(|_| "/usr/share/fonts/truetype/dejavu".to_string()),
    );

    let app_state = AppState {
        lifecycle,
        images,
        fonts_dir,
    };

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api/v1")
                    .route("/ideas", web::get().to(suggest_ideas))
                    .route("/designs", web::post().to(generate_design))
                    .route("/designs", web::get().to(list_designs))
                    .route("/designs", web::delete().to(clear_designs))
                    .route("/designs/bulk", web::post().to(generate_bulk))
                    .route(
                        "/designs/{id}/remove-background",
                        web::post().to(remove_background),
                    )
                    .route("/designs/{id}/upscale", web::post().to(upscale))
                    .route("/designs/{id}/revert", web::post().to(revert))
                    .route("/designs/{id}/remix", web::post().to(remix))
                    .route("/designs/{id}/overlay", web::post().to(apply_overlay))
                    .route("/analyze", web::post().to(analyze_upload))
                    .route("/analysis", web::get().to(latest_analysis))
                    .route("/export/images.zip", web::get().to(export_images))
                    .route("/export/metadata.xlsx", web::get().to(export_metadata)),
            )
            .route("/health", web::get().to(health_check))
    })
    .bind(bind_addr)?
    .run()
    .await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "teesmith",
        "version": "0.1.0"
    }))
}
