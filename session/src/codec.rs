//! Text encoding of session payloads.
//!
//! Payloads are stored as standard, padded base64 so that any byte sequence,
//! including empty and non-UTF-8 ones, survives a text column unchanged.
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Malformed text decodes to `None`; callers treat it as a missing payload.
pub fn decode(text: &str) -> Option<Vec<u8>> {
    STANDARD.decode(text).ok()
}
