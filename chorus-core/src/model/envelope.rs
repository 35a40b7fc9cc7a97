use crate::error::ConferenceError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

/// Encode an application payload for the data channel: JSON document,
/// UTF-8 stringified, wrapped in base64. One document per text frame,
/// no length prefix.
pub fn encode_payload<T: Serialize>(payload: &T) -> Result<String, ConferenceError> {
    let json = serde_json::to_string(payload)
        .map_err(|e| ConferenceError::Protocol(format!("payload encoding failed: {e}")))?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Wrap already-serialized payload bytes in base64.
pub fn encode_raw(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode an inbound data-channel frame back to the raw UTF-8 payload bytes.
/// The payload shape beyond being UTF-8 text is an application-layer contract
/// and is not inspected here.
pub fn decode_payload(data: &[u8]) -> Result<Vec<u8>, ConferenceError> {
    let decoded = STANDARD
        .decode(data)
        .map_err(|e| ConferenceError::Protocol(format!("invalid base64 frame: {e}")))?;
    std::str::from_utf8(&decoded)
        .map_err(|e| ConferenceError::Protocol(format!("frame is not UTF-8: {e}")))?;
    Ok(decoded)
}
