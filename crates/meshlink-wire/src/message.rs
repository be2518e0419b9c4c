//! Wire codec trait and stream framing.
//!
//! Control messages convert to and from a [`WireValue`] tree. For byte
//! streams the tree is rendered as JSON and prefixed with a 4-byte
//! big-endian length header. Mappings are ordered, so the same message
//! always produces the same bytes.

use meshlink_types::{DecodeError, DecodeOptions, WireValue};
use thiserror::Error;

/// Conversion between a control message and its wire value tree.
pub trait WireCodec: Sized {
    /// Encode into a wire tree.
    fn to_wire(&self) -> WireValue;

    /// Decode from a wire tree under the given options.
    fn from_wire_with(value: &WireValue, opts: &DecodeOptions) -> Result<Self, DecodeError>;

    /// Decode with the default (strict) options.
    fn from_wire(value: &WireValue) -> Result<Self, DecodeError> {
        Self::from_wire_with(value, &DecodeOptions::default())
    }
}

/// Apply the decode policy to a required field lookup.
///
/// Strict: absent is `MissingField`, malformed is passed through.
/// Lenient: both absent and malformed become `None`.
pub(crate) fn policy_field<T>(
    found: Result<Option<T>, DecodeError>,
    key: &str,
    opts: &DecodeOptions,
) -> Result<Option<T>, DecodeError> {
    match found {
        Ok(Some(v)) => Ok(Some(v)),
        Ok(None) | Err(_) if opts.is_lenient() => Ok(None),
        Ok(None) => Err(DecodeError::MissingField(key.to_string())),
        Err(e) => Err(e),
    }
}

/// Errors from framing a message for a byte stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The body is not valid JSON, or not a wire value tree.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The tree parsed but is not the expected message.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    /// The payload exceeds the configured frame limit.
    #[error("Frame too large: {size} bytes (max {max})")]
    TooLarge {
        /// Payload length in bytes.
        size: usize,
        /// Configured limit.
        max: u32,
    },
}

/// Encode a message to bytes (4-byte big-endian length + JSON).
pub fn encode_frame<M: WireCodec>(msg: &M, max: u32) -> Result<Vec<u8>, FrameError> {
    let json = serde_json::to_vec(&msg.to_wire())?;
    if json.len() > max as usize {
        return Err(FrameError::TooLarge {
            size: json.len(),
            max,
        });
    }
    let len = json.len() as u32;
    let mut bytes = Vec::with_capacity(4 + json.len());
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(&json);
    Ok(bytes)
}

/// Decode the length prefix from a 4-byte header.
pub fn decode_length(header: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*header)
}

/// Parse a JSON frame body into a message.
pub fn decode_frame<M: WireCodec>(
    body: &[u8],
    max: u32,
    opts: &DecodeOptions,
) -> Result<M, FrameError> {
    if body.len() > max as usize {
        return Err(FrameError::TooLarge {
            size: body.len(),
            max,
        });
    }
    let value: WireValue = serde_json::from_slice(body)?;
    Ok(M::from_wire_with(&value, opts)?)
}
