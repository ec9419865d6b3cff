//! Standalone base64 codec.
//!
//! Self-contained utility with no connection to the tree pipeline:
//! standard RFC 4648 alphabet, `=` padding on encode, and a decoder that
//! skips whitespace and accepts input with or without padding.

use ::base64::Engine as _;
use ::base64::alphabet;
use ::base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

pub use ::base64::DecodeError;

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as base64 text with `=` padding.
pub fn encode64(data: &[u8]) -> String {
    ENGINE.encode(data)
}

/// Decode base64 text into bytes. Whitespace anywhere in the input is
/// skipped rather than rejected.
pub fn decode64(text: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    ENGINE.decode(compact)
}
