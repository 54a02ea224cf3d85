// src/overlay.rs
//
// Text-overlay editor support: direct-manipulation math (bounds, hit-testing,
// position clamping) plus the compositor that flattens a label onto a design's
// current image. Saving replaces only the current image; the original and the
// transform flags stay as they were.
use crate::errors::StudioError;
use ab_glyph::{FontVec, PxScale};
use image::Rgba;
use imageproc::drawing::{draw_text_mut, text_size};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_FONT_FAMILY: &str = "DejaVuSans";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,
    pub font_size: f32,
    /// "#rrggbb"
    pub color: String,
    #[serde(default)]
    pub font_family: Option<String>,
    /// Top-left corner of the text in image pixels.
    pub x: i32,
    pub y: i32,
}

impl TextOverlay {
    pub fn validate(&self) -> Result<(), StudioError> {
        if self.text.trim().is_empty() {
            return Err(StudioError::Validation(
                "Overlay text must not be empty".to_string(),
            ));
        }
        if !(self.font_size > 0.0) {
            return Err(StudioError::Validation(
                "Font size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn parse_hex_color(color: &str) -> Result<Rgba<u8>, StudioError> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 {
        return Err(StudioError::Validation(format!(
            "Color must be #rrggbb, got \"{}\"",
            color
        )));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| {
            StudioError::Validation(format!("Color must be #rrggbb, got \"{}\"", color))
        })
    };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

/// Pixel size of the rendered text.
pub fn text_bounds(font: &FontVec, overlay: &TextOverlay) -> (u32, u32) {
    let (w, h) = text_size(PxScale::from(overlay.font_size), font, &overlay.text);
    (w as u32, h as u32)
}

/// Whether a pointer position lands inside the rendered text's bounding box.
pub fn hit_test(overlay: &TextOverlay, bounds: (u32, u32), px: i32, py: i32) -> bool {
    let (w, h) = (bounds.0 as i32, bounds.1 as i32);
    px >= overlay.x && px < overlay.x + w && py >= overlay.y && py < overlay.y + h
}

/// Keeps the text's top-left corner inside the canvas while dragging.
pub fn clamp_position(overlay: &TextOverlay, canvas: (u32, u32), bounds: (u32, u32)) -> (i32, i32) {
    let max_x = (canvas.0 as i32 - bounds.0 as i32).max(0);
    let max_y = (canvas.1 as i32 - bounds.1 as i32).max(0);
    (overlay.x.clamp(0, max_x), overlay.y.clamp(0, max_y))
}

/// Flattens the overlay onto the base image and returns the new PNG bytes.
pub fn composite(base: &[u8], overlay: &TextOverlay, font: &FontVec) -> Result<Vec<u8>, StudioError> {
    overlay.validate()?;
    let color = parse_hex_color(&overlay.color)?;

    let mut canvas = image::load_from_memory(base)
        .map_err(|e| StudioError::Image(format!("Invalid base image: {}", e)))?
        .to_rgba8();

    let bounds = text_bounds(font, overlay);
    let (x, y) = clamp_position(overlay, canvas.dimensions(), bounds);
    draw_text_mut(
        &mut canvas,
        color,
        x,
        y,
        PxScale::from(overlay.font_size),
        font,
        &overlay.text,
    );

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| StudioError::Image(format!("Failed to encode edited image: {}", e)))?;
    Ok(out)
}

/// Loads a font by family name from the configured fonts directory.
pub fn load_font(fonts_dir: &Path, family: Option<&str>) -> Result<FontVec, StudioError> {
    let family = family.unwrap_or(DEFAULT_FONT_FAMILY);
    if family.contains(['/', '\\', '.']) {
        return Err(StudioError::Validation(format!(
            "Invalid font family \"{}\"",
            family
        )));
    }

    let path = fonts_dir.join(format!("{}.ttf", family));
    let bytes = std::fs::read(&path).map_err(|e| {
        StudioError::Configuration(format!("Font {} not available: {}", path.display(), e))
    })?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| StudioError::Configuration(format!("Font {} unreadable: {}", path.display(), e)))
}
