//! Protocol configuration, loaded from TOML.
//!
//! ```toml
//! [decode]
//! policy = "lenient"
//! allow_empty_token = false
//!
//! [frame]
//! max_frame_size = 1048576
//! ```
//!
//! Every field has a default, so an empty document is a valid config.

use crate::connection::Token;
use crate::error::{ConfigError, DecodeError, DecodeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default upper bound on a single frame (16 MB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// How forgiving message decoding is toward incomplete wire trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Missing or malformed required fields are decode errors.
    #[default]
    Strict,
    /// Missing or malformed optional sub-structures are left empty, for
    /// peers that send partial messages.
    Lenient,
}

/// Options threaded through every `from_wire` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub policy: DecodePolicy,
    /// Whether a handshake may use the empty string as its token.
    pub allow_empty_token: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            policy: DecodePolicy::Strict,
            allow_empty_token: true,
        }
    }
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        Self {
            policy: DecodePolicy::Lenient,
            ..Self::default()
        }
    }

    pub fn is_lenient(&self) -> bool {
        self.policy == DecodePolicy::Lenient
    }

    /// Apply the empty-token rule to a decoded token.
    pub fn check_token(&self, token: &Token) -> DecodeResult<()> {
        if token.is_empty() && !self.allow_empty_token {
            return Err(DecodeError::EmptyToken);
        }
        Ok(())
    }
}

/// Limits applied when framing messages for a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub max_frame_size: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Top-level protocol configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub decode: DecodeOptions,
    pub frame: FrameConfig,
}

impl ProtocolConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::TomlParse(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
