// src/export.rs
//
// Pure transformations of an Asset Store snapshot: a zip of the current
// images and a spreadsheet of the listing metadata.
use crate::errors::StudioError;
use crate::models::Design;
use crate::services::ImageProcessor;
use rust_xlsxwriter::Workbook;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const METADATA_HEADERS: [&str; 6] = [
    "Title",
    "Description",
    "Tags",
    "Type",
    "Color",
    "Original Idea",
];

/// Filesystem-safe slug of a title: lowercase alphanumerics joined by single
/// hyphens. Degenerate titles slug to the empty string.
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

/// One archive entry name per design, in order: the title slug, falling back
/// to a positional name, with collisions disambiguated by a numeric suffix.
fn entry_names(designs: &[Design]) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut names = Vec::with_capacity(designs.len());
    for (i, design) in designs.iter().enumerate() {
        let base = match slug(&design.metadata.title) {
            s if s.is_empty() => format!("design-{}", i + 1),
            s => s,
        };
        let mut name = base.clone();
        let mut n = 2;
        while !taken.insert(name.clone()) {
            name = format!("{}-{}", base, n);
            n += 1;
        }
        names.push(name);
    }
    names
}

/// Bundles every design's current image into a single zip archive.
pub async fn package_images(
    images: &ImageProcessor,
    designs: &[Design],
) -> Result<Vec<u8>, StudioError> {
    if designs.is_empty() {
        return Err(StudioError::Validation("No designs to export".to_string()));
    }

    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (design, name) in designs.iter().zip(entry_names(designs)) {
        let bytes = images.resolve(&design.image_url).await?;
        archive
            .start_file(format!("{}.png", name), options)
            .map_err(|e| StudioError::Storage(format!("Archive write failed: {}", e)))?;
        archive
            .write_all(&bytes)
            .map_err(|e| StudioError::Storage(format!("Archive write failed: {}", e)))?;
    }

    let cursor = archive
        .finish()
        .map_err(|e| StudioError::Storage(format!("Archive finalize failed: {}", e)))?;
    Ok(cursor.into_inner())
}

/// One metadata row per design, in store order.
pub fn metadata_rows(designs: &[Design]) -> Vec<[String; 6]> {
    designs
        .iter()
        .map(|d| {
            [
                d.metadata.title.clone(),
                d.metadata.description.clone(),
                d.metadata.tags.clone(),
                d.metadata.design_type.clone(),
                d.metadata.color.clone(),
                d.original_idea.clone(),
            ]
        })
        .collect()
}

/// Renders the metadata table as an xlsx workbook.
pub fn metadata_workbook(designs: &[Design]) -> Result<Vec<u8>, StudioError> {
    if designs.is_empty() {
        return Err(StudioError::Validation("No designs to export".to_string()));
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("Designs")
        .map_err(|e| StudioError::Storage(format!("Workbook write failed: {}", e)))?;

    for (col, header) in METADATA_HEADERS.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *header)
            .map_err(|e| StudioError::Storage(format!("Workbook write failed: {}", e)))?;
    }
    for (row, cells) in metadata_rows(designs).iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            sheet
                .write_string(row as u32 + 1, col as u16, cell)
                .map_err(|e| StudioError::Storage(format!("Workbook write failed: {}", e)))?;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| StudioError::Storage(format!("Workbook save failed: {}", e)))
}
