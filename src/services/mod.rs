// src/services/mod.rs
pub mod ai_gateway;
pub mod asset_store;
pub mod bg_removal;
pub mod image_processor;

pub use ai_gateway::{AiGateway, GenerativeGateway};
pub use asset_store::{AssetStore, PersistenceBackend, RedisBackend};
pub use bg_removal::{BgRemovalService, MatteGateway};
pub use image_processor::ImageProcessor;
