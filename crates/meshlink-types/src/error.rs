//! Shared error types for the meshlink value layer.

use thiserror::Error;

/// Failure to rebuild a value or message from a wire tree.
///
/// Decode errors are always recoverable: the caller drops the offending
/// message (or refuses the link) and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The value at the given position was expected to be a mapping.
    #[error("Expected a mapping for '{0}'")]
    NotAMap(String),

    /// A required field is absent.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A field is present but has the wrong shape.
    #[error("Field '{field}' has the wrong shape (expected {expected})")]
    WrongShape {
        /// The offending key.
        field: String,
        /// What the decoder wanted to find there.
        expected: &'static str,
    },

    /// The connection type string names no known overlay subsystem.
    #[error("Unknown connection type: {0}")]
    UnknownConnectionType(String),

    /// An attribute key collides with one of the reserved message keys.
    #[error("Attribute key '{0}' is reserved")]
    ReservedAttribute(String),

    /// An empty handshake token was rejected by the decode options.
    #[error("Empty handshake token")]
    EmptyToken,

    /// The overlay address text is not usable.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The transport endpoint text is not a valid URI.
    #[error("Invalid transport address '{address}': {reason}")]
    InvalidTransportAddress {
        /// The text that failed to parse.
        address: String,
        /// Parser message.
        reason: String,
    },
}

/// Alias for Result with DecodeError.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors raised while loading a [`ProtocolConfig`](crate::config::ProtocolConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The config text is not valid TOML for this schema.
    #[error("TOML parse error: {0}")]
    TomlParse(String),
}
