//! Base64 payload decoding and image sniffing

use base64::{engine::general_purpose::STANDARD, Engine};
use crate::error::{AppError, Result};

/// Encode binary data to base64 string
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a plain base64 string or a `data:` URL
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    let data = strip_data_url(encoded);

    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| AppError::InvalidInput(format!("Invalid base64 data: {}", e)))
}

/// Check if a string is valid base64
pub fn is_valid(data: &str) -> bool {
    decode(data).is_ok()
}

fn strip_data_url(encoded: &str) -> &str {
    let trimmed = encoded.trim();
    match (trimmed.starts_with("data:"), trimmed.find(',')) {
        (true, Some(comma)) => &trimmed[comma + 1..],
        _ => trimmed,
    }
}

/// Decode a named payload field, reporting failures as engine-side errors.
///
/// Decoding happens after request validation, so a payload that is present
/// but malformed fails the task instead of being rejected as bad input.
pub fn decode_payload(field: &str, encoded: &str) -> Result<Vec<u8>> {
    let bytes = decode(encoded)
        .map_err(|_| AppError::BackendFailure(format!("{} is not valid base64", field)))?;
    if bytes.is_empty() {
        return Err(AppError::BackendFailure(format!("{} decoded to an empty payload", field)));
    }
    Ok(bytes)
}

/// Decode a reference image and check its size and format
pub fn decode_image(field: &str, encoded: &str, max_bytes: usize) -> Result<Vec<u8>> {
    let bytes = decode_payload(field, encoded)?;

    if bytes.len() > max_bytes {
        return Err(AppError::BackendFailure(format!(
            "{} exceeds the {} byte limit",
            field, max_bytes
        )));
    }

    match detect_image_format(&bytes) {
        Some("png") | Some("jpg") | Some("webp") => Ok(bytes),
        _ => Err(AppError::BackendFailure(format!(
            "{} must be a PNG, JPEG or WebP image",
            field
        ))),
    }
}

/// Detect image format from binary data using magic bytes
pub fn detect_image_format(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("webp");
    }

    None
}
