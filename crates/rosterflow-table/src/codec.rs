//! Self-describing payload codec.
//!
//! Uploaded file bytes are stored inline as `data:<mime>;base64,<data>`.
//! `decode_payload` and `encode_payload` are exact inverses for every valid
//! byte buffer and MIME tag.

use base64::{engine::general_purpose, Engine as _};

use crate::error::TableError;

const PREFIX: &str = "data:";
const SEPARATOR: &str = ";base64,";

/// Decode a stored payload into its raw bytes and MIME type.
pub fn decode_payload(payload: &str) -> Result<(Vec<u8>, String), TableError> {
    let rest = payload
        .strip_prefix(PREFIX)
        .ok_or_else(|| TableError::MalformedPayload("missing data: prefix".to_string()))?;

    let (mime, data) = rest
        .split_once(SEPARATOR)
        .ok_or_else(|| TableError::MalformedPayload("missing base64 separator".to_string()))?;

    if mime.is_empty() {
        return Err(TableError::MalformedPayload("empty mime tag".to_string()));
    }

    let bytes = general_purpose::STANDARD
        .decode(data)
        .map_err(|e| TableError::MalformedPayload(format!("invalid base64: {}", e)))?;

    Ok((bytes, mime.to_string()))
}

/// Encode raw bytes and a MIME type into the stored payload form.
pub fn encode_payload(bytes: &[u8], mime: &str) -> String {
    format!(
        "{}{}{}{}",
        PREFIX,
        mime,
        SEPARATOR,
        general_purpose::STANDARD.encode(bytes)
    )
}
