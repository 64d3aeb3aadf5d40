//! Primitive array payloads
//!
//! Arrays are written as CBOR and wrapped in standard base64 so the payload
//! survives a `text` column unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::ProxyError;
use crate::model::TypeTag;

/// Serialize an array to its opaque text form
pub fn encode_array<T: Serialize>(items: &[T]) -> Result<String, ProxyError> {
    let mut buffer = Vec::new();
    ciborium::ser::into_writer(items, &mut buffer).map_err(|e| ProxyError::Serialization {
        message: format!("Failed to serialize array: {}", e),
    })?;
    Ok(STANDARD.encode(buffer))
}

/// Parse an opaque text form back into an array
pub fn decode_array<T: DeserializeOwned>(tag: TypeTag, raw: &str) -> Result<Vec<T>, ProxyError> {
    let bytes = STANDARD
        .decode(raw.trim())
        .map_err(|e| ProxyError::DecodeFailed {
            tag: tag.to_string(),
            reason: format!("invalid base64: {}", e),
        })?;
    ciborium::de::from_reader(bytes.as_slice()).map_err(|e| ProxyError::DecodeFailed {
        tag: tag.to_string(),
        reason: format!("invalid array payload: {}", e),
    })
}
