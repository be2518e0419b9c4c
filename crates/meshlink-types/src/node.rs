//! Node identity values: overlay addresses, transport endpoints and the
//! [`NodeInfo`] pair that control messages carry.
//!
//! These are plain immutable values. Routing semantics (ring distance,
//! directional addresses, ...) live with the routing strategies, not here.

use crate::error::{DecodeError, DecodeResult};
use crate::value::{list_field, str_field, WireMap, WireValue};
use std::fmt;
use std::str::FromStr;

/// An opaque overlay address, e.g. `brunet:node:JOJZG7VO6RFOEZJ6CJJ2WOIJWTXRVRP4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Validate and wrap an overlay address.
    pub fn parse(s: &str) -> DecodeResult<Self> {
        if s.is_empty() {
            return Err(DecodeError::InvalidAddress("empty address".into()));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(DecodeError::InvalidAddress(format!(
                "'{s}' contains whitespace"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// The address text as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = DecodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transport endpoint such as `brunet.tcp://127.0.0.1:5000`.
///
/// The text is validated as a URI but kept verbatim, so it survives a wire
/// round-trip byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportAddress(String);

impl TransportAddress {
    /// Validate and wrap a transport endpoint URI.
    pub fn parse(s: &str) -> DecodeResult<Self> {
        url::Url::parse(s).map_err(|e| DecodeError::InvalidTransportAddress {
            address: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(s.to_string()))
    }

    /// The transport kind, e.g. `brunet.tcp` or `brunet.udp`.
    pub fn scheme(&self) -> &str {
        self.0.split_once(':').map(|(s, _)| s).unwrap_or(&self.0)
    }

    /// The full endpoint URI, unnormalized.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TransportAddress {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TransportAddress {
    type Error = DecodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TransportAddress> for String {
    fn from(ta: TransportAddress) -> Self {
        ta.0
    }
}

impl fmt::Display for TransportAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node's overlay address plus the transport endpoints it can be reached on.
///
/// The address may be unknown (a peer seen only by its endpoint before the
/// handshake completes). Endpoint order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodeInfo {
    address: Option<Address>,
    endpoints: Vec<TransportAddress>,
}

impl NodeInfo {
    /// Pair an (optional) address with its endpoints, most preferred first.
    pub fn new(address: Option<Address>, endpoints: Vec<TransportAddress>) -> Self {
        Self { address, endpoints }
    }

    /// A node reachable on exactly one endpoint.
    pub fn single(address: Option<Address>, endpoint: TransportAddress) -> Self {
        Self::new(address, vec![endpoint])
    }

    /// The overlay address, if known.
    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// Transport endpoints in preference order.
    pub fn endpoints(&self) -> &[TransportAddress] {
        &self.endpoints
    }

    /// Encode as `{address?, transports: [..]}`.
    pub fn to_wire(&self) -> WireValue {
        let mut map = WireMap::new();
        if let Some(addr) = &self.address {
            map.insert("address".into(), addr.as_str().into());
        }
        let transports = self
            .endpoints
            .iter()
            .map(|ta| WireValue::from(ta.as_str()))
            .collect::<Vec<_>>();
        map.insert("transports".into(), transports.into());
        WireValue::Map(map)
    }

    /// Decode from the mapping produced by [`NodeInfo::to_wire`].
    pub fn from_wire(value: &WireValue) -> DecodeResult<Self> {
        Self::from_wire_map(value.expect_map("node info")?)
    }

    /// Decode from an already-unwrapped mapping.
    pub fn from_wire_map(map: &WireMap) -> DecodeResult<Self> {
        let address = str_field(map, "address")?.map(Address::parse).transpose()?;
        let endpoints = match list_field(map, "transports")? {
            None => Vec::new(),
            Some(items) => items
                .iter()
                .map(|item| {
                    let s = item.as_str().ok_or_else(|| DecodeError::WrongShape {
                        field: "transports".into(),
                        expected: "list of strings",
                    })?;
                    TransportAddress::parse(s)
                })
                .collect::<DecodeResult<Vec<_>>>()?,
        };
        Ok(Self { address, endpoints })
    }
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(a) => write!(f, "{a}")?,
            None => f.write_str("<unknown>")?,
        }
        f.write_str(" [")?;
        for (i, ta) in self.endpoints.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ta}")?;
        }
        f.write_str("]")
    }
}
