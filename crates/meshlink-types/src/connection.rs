//! Connection types and handshake tokens.

use crate::error::{DecodeError, DecodeResult};
use std::fmt;
use std::str::FromStr;

/// Which overlay subsystem a link belongs to.
///
/// On the wire a connection type may carry a dotted subtype such as
/// `structured.near`; only the part before the first `.` selects the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    /// Edge link to a leaf node bootstrapping into the overlay.
    Leaf,
    /// Ring link maintained by the structured overlay.
    Structured,
    /// Random link maintained by the unstructured overlay.
    Unstructured,
}

impl ConnectionType {
    /// Canonical lowercase wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::Structured => "structured",
            Self::Unstructured => "unstructured",
        }
    }

    /// Parse the main type of a (possibly dotted) connection type string.
    pub fn from_main_type(s: &str) -> DecodeResult<Self> {
        let main = s.split('.').next().unwrap_or(s);
        match main {
            "leaf" => Ok(Self::Leaf),
            "structured" => Ok(Self::Structured),
            "unstructured" => Ok(Self::Unstructured),
            _ => Err(DecodeError::UnknownConnectionType(s.to_string())),
        }
    }
}

impl FromStr for ConnectionType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_main_type(s)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque correlator shared by every message of one handshake attempt.
///
/// Never interpreted; compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Token(String);

impl Token {
    /// Wrap an existing token string verbatim.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// A fresh random token (UUID v4).
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
