use base64::Engine;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::{config::ApiConfig, models::ImageUpload};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("uploaded file is empty")]
    Empty,
    #[error("image is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },
    #[error("unsupported image type {0}")]
    UnsupportedType(String),
    #[error("file content is not a recognizable image")]
    Unrecognized,
    #[error("declared type {declared} does not match detected {detected}")]
    Mismatch { declared: String, detected: String },
}

/// Checks size and format of an uploaded photo and builds its preview URI.
pub fn validate_image(
    file_name: Option<&str>,
    content_type: Option<&str>,
    data: Bytes,
    api: &ApiConfig,
) -> Result<ImageUpload, UploadError> {
    if data.is_empty() {
        return Err(UploadError::Empty);
    }
    if data.len() > api.max_file_size {
        return Err(UploadError::TooLarge { size: data.len(), max: api.max_file_size });
    }

    let detected = image::guess_format(&data)
        .map_err(|_| UploadError::Unrecognized)?
        .to_mime_type();

    let declared = content_type.map(normalize_mime).unwrap_or(detected);
    if !declared.starts_with("image/") {
        return Err(UploadError::UnsupportedType(declared.to_string()));
    }
    if !api.supported_formats.iter().any(|f| f == detected) {
        return Err(UploadError::UnsupportedType(detected.to_string()));
    }
    if declared != detected {
        return Err(UploadError::Mismatch { declared: declared.to_string(), detected: detected.to_string() });
    }

    let file_name = file_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("product.{}", extension_for(detected)));
    info!("📷 Accepted upload '{}' ({} bytes, {})", file_name, data.len(), detected);

    Ok(ImageUpload {
        preview: format!("data:{};base64,{}", detected, base64::engine::general_purpose::STANDARD.encode(&data)),
        file_name,
        content_type: detected.to_string(),
        size: data.len(),
        data,
    })
}

fn normalize_mime(raw: &str) -> &str {
    let raw = raw.split(';').next().unwrap_or(raw).trim();
    match raw {
        "image/jpg" | "image/pjpeg" => "image/jpeg",
        other => other,
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}
