use crate::error::{OcrError, Result};
use image::DynamicImage;
use std::fs;
use std::path::Path;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff", "tif"];

pub fn is_supported_format(path: &Path) -> bool {
    extension_lower(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Comma-separated list such as `.jpg, .jpeg, .png`.
pub fn supported_formats() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Existence and argument checks only; nothing is read.
pub(crate) fn ensure_readable_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(OcrError::invalid("image path is empty"));
    }
    if !path.exists() {
        return Err(OcrError::NotFound(path.to_path_buf()));
    }
    Ok(())
}

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    ensure_readable_path(path)?;
    if !is_supported_format(path) {
        return Err(OcrError::UnsupportedFormat(format!(
            "{} (supported: {})",
            path.display(),
            supported_formats()
        )));
    }

    let bytes = fs::read(path).map_err(|err| OcrError::Decode {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    if let Some(kind) = infer::get(&bytes) {
        if !kind.mime_type().starts_with("image/") {
            return Err(OcrError::UnsupportedFormat(format!(
                "{} contains {} data",
                path.display(),
                kind.mime_type()
            )));
        }
    }

    image::load_from_memory(&bytes).map_err(|err| OcrError::Decode {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
}
