//! Typed descriptors for the well-known routing schemes.
//!
//! The senders themselves are registered by the routing layer; these types
//! only build and read their URIs.
//!
//! - `sender:ah?dest=<address>&mode=exact|greedy` — deliver to an address,
//!   either requiring an exact match or to the closest node.
//! - `sender:fw?dest=..&init_mode=..&mode=path&relay=..&ttl=..` — route to
//!   `relay` first, which forwards to `dest` within `ttl` hops.

use crate::descriptor::{DescriptorFault, SenderDescriptor, SenderError};
use meshlink_types::Address;
use std::fmt;
use std::str::FromStr;

pub const AH_SCHEME: &str = "ah";
pub const FORWARDING_SCHEME: &str = "fw";

/// Delivery mode of an address-routed (`ah`) sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AhMode {
    /// Deliver only to the node with exactly this address.
    Exact,
    /// Deliver to the node closest to the address.
    Greedy,
}

impl AhMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Greedy => "greedy",
        }
    }
}

impl FromStr for AhMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "greedy" => Ok(Self::Greedy),
            other => Err(format!("unknown routing mode '{other}'")),
        }
    }
}

impl fmt::Display for AhMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid(d: &SenderDescriptor, key: &str, reason: impl fmt::Display) -> SenderError {
    SenderError::malformed(
        &d.to_uri(),
        DescriptorFault::InvalidOption {
            key: key.to_string(),
            reason: reason.to_string(),
        },
    )
}

fn address_option(d: &SenderDescriptor, key: &str) -> Result<Address, SenderError> {
    Address::parse(d.require(key)?).map_err(|e| invalid(d, key, e))
}

fn mode_option(d: &SenderDescriptor, key: &str) -> Result<AhMode, SenderError> {
    d.require(key)?.parse().map_err(|e: String| invalid(d, key, e))
}

/// `sender:ah` — address-routed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AhDescriptor {
    /// Destination address.
    pub dest: Address,
    /// Whether delivery needs an exact address match.
    pub mode: AhMode,
}

impl AhDescriptor {
    pub fn to_descriptor(&self) -> SenderDescriptor {
        SenderDescriptor::unchecked(AH_SCHEME)
            .with_option("dest", self.dest.as_str())
            .with_option("mode", self.mode.as_str())
    }

    pub fn to_uri(&self) -> String {
        self.to_descriptor().to_uri()
    }

    pub fn from_descriptor(d: &SenderDescriptor) -> Result<Self, SenderError> {
        d.expect_scheme(AH_SCHEME)?;
        Ok(Self {
            dest: address_option(d, "dest")?,
            mode: mode_option(d, "mode")?,
        })
    }

    pub fn from_uri(uri: &str) -> Result<Self, SenderError> {
        Self::from_descriptor(&uri.parse::<SenderDescriptor>()?)
    }
}

/// `sender:fw` — relay-forwarded delivery bounded by a hop count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingDescriptor {
    /// Node that forwards on our behalf.
    pub relay: Address,
    /// How to reach the relay.
    pub init_mode: AhMode,
    /// Final destination.
    pub dest: Address,
    /// Hops the relay may spend reaching `dest`.
    pub ttl: u16,
}

impl ForwardingDescriptor {
    pub fn to_descriptor(&self) -> SenderDescriptor {
        SenderDescriptor::unchecked(FORWARDING_SCHEME)
            .with_option("relay", self.relay.as_str())
            .with_option("init_mode", self.init_mode.as_str())
            .with_option("dest", self.dest.as_str())
            .with_option("ttl", self.ttl.to_string())
            .with_option("mode", "path")
    }

    pub fn to_uri(&self) -> String {
        self.to_descriptor().to_uri()
    }

    pub fn from_descriptor(d: &SenderDescriptor) -> Result<Self, SenderError> {
        d.expect_scheme(FORWARDING_SCHEME)?;
        let mode = d.require("mode")?;
        if mode != "path" {
            return Err(invalid(d, "mode", format!("expected 'path', found '{mode}'")));
        }
        let ttl = d
            .require("ttl")?
            .parse::<u16>()
            .map_err(|e| invalid(d, "ttl", e))?;
        Ok(Self {
            relay: address_option(d, "relay")?,
            init_mode: mode_option(d, "init_mode")?,
            dest: address_option(d, "dest")?,
            ttl,
        })
    }

    pub fn from_uri(uri: &str) -> Result<Self, SenderError> {
        Self::from_descriptor(&uri.parse::<SenderDescriptor>()?)
    }
}
