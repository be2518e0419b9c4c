//! Core value types for the meshlink overlay control plane.
//!
//! This crate defines the shared data structures used by the wire protocol:
//! the wire value tree, node identities, connection types, handshake tokens,
//! decode errors and protocol configuration. It contains no protocol logic.

pub mod config;
pub mod connection;
pub mod error;
pub mod node;
pub mod value;

pub use config::{DecodeOptions, DecodePolicy, FrameConfig, ProtocolConfig};
pub use connection::{ConnectionType, Token};
pub use error::{ConfigError, DecodeError, DecodeResult};
pub use node::{Address, NodeInfo, TransportAddress};
pub use value::{WireMap, WireValue};
