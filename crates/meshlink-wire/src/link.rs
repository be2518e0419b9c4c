//! Link handshake messages.
//!
//! Two nodes exchange [`LinkMessage`]s while forming a direct link. Each side
//! reports the [`NodeInfo`] it believes it has (`local`) and the one it sees
//! for the peer (`remote`), which lets a node notice that a NAT is rewriting
//! its endpoints. The token ties request and response together.

use crate::message::{policy_field, WireCodec};
use meshlink_types::value::{map_field, str_field};
use meshlink_types::{
    ConnectionType, DecodeError, DecodeOptions, DecodeResult, NodeInfo, Token, WireMap, WireValue,
};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Keys with a fixed meaning in a link message mapping.
pub const RESERVED_KEYS: [&str; 4] = ["type", "local", "remote", "token"];

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// The attribute bag of a link message: the mandatory connection type plus
/// free-form extension fields (e.g. `realm`).
///
/// Extension keys never collide with [`RESERVED_KEYS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAttributes {
    connection_type: String,
    extra: BTreeMap<String, String>,
}

impl LinkAttributes {
    /// Attributes with only a connection type, e.g. `structured.near`.
    pub fn new(connection_type: impl Into<String>) -> Self {
        Self {
            connection_type: connection_type.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Attributes for a bare main connection type.
    pub fn from_type(ct: ConnectionType) -> Self {
        Self::new(ct.as_str())
    }

    /// Build from a flat string map that includes `type`.
    pub fn from_entries<I, K, V>(entries: I) -> DecodeResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut connection_type = None;
        let mut extra = BTreeMap::new();
        for (k, v) in entries {
            let key = k.into();
            if key == "type" {
                connection_type = Some(v.into());
            } else if is_reserved(&key) {
                return Err(DecodeError::ReservedAttribute(key));
            } else {
                extra.insert(key, v.into());
            }
        }
        let connection_type =
            connection_type.ok_or_else(|| DecodeError::MissingField("type".into()))?;
        Ok(Self {
            connection_type,
            extra,
        })
    }

    /// Add an extension attribute, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> DecodeResult<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Add or replace an extension attribute, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> DecodeResult<Option<String>> {
        let key = key.into();
        if is_reserved(&key) {
            return Err(DecodeError::ReservedAttribute(key));
        }
        Ok(self.extra.insert(key, value.into()))
    }

    /// The raw `type` attribute.
    pub fn connection_type(&self) -> &str {
        &self.connection_type
    }

    /// Look up any attribute, `type` included.
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == "type" {
            Some(&self.connection_type)
        } else {
            self.extra.get(key).map(String::as_str)
        }
    }

    /// Extension attributes only.
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Every attribute, `type` first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        std::iter::once(("type", self.connection_type.as_str()))
            .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// A link handshake message. Immutable once built.
///
/// `local` and `remote` are always set on messages built here; they can only
/// be absent on messages decoded with [`DecodePolicy::Lenient`](meshlink_types::DecodePolicy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    attributes: LinkAttributes,
    local: Option<NodeInfo>,
    remote: Option<NodeInfo>,
    token: Token,
}

impl LinkMessage {
    /// Build with a main connection type and no extension attributes.
    pub fn new(ct: ConnectionType, local: NodeInfo, remote: NodeInfo, token: Token) -> Self {
        Self::with_attributes(LinkAttributes::from_type(ct), local, remote, token)
    }

    /// Build with a raw connection type string such as `structured.near`.
    pub fn with_type(
        connection_type: &str,
        local: NodeInfo,
        remote: NodeInfo,
        token: Token,
    ) -> Self {
        Self::with_attributes(LinkAttributes::new(connection_type), local, remote, token)
    }

    /// Build with a full attribute set.
    pub fn with_attributes(
        attributes: LinkAttributes,
        local: NodeInfo,
        remote: NodeInfo,
        token: Token,
    ) -> Self {
        Self {
            attributes,
            local: Some(local),
            remote: Some(remote),
            token,
        }
    }

    /// The main connection type, parsed from the `type` attribute.
    pub fn connection_type(&self) -> DecodeResult<ConnectionType> {
        ConnectionType::from_main_type(&self.attributes.connection_type)
    }

    /// The raw `type` attribute.
    pub fn connection_type_str(&self) -> &str {
        &self.attributes.connection_type
    }

    /// Every attribute, `type` included.
    pub fn attributes(&self) -> &LinkAttributes {
        &self.attributes
    }

    /// The sender's view of itself.
    pub fn local(&self) -> Option<&NodeInfo> {
        self.local.as_ref()
    }

    /// The sender's view of the peer.
    pub fn remote(&self) -> Option<&NodeInfo> {
        self.remote.as_ref()
    }

    /// Correlates this message with the rest of its handshake.
    pub fn token(&self) -> &Token {
        &self.token
    }
}

/// Hashes `remote` only. Equal messages share a remote, so this agrees with
/// `Eq`, but all messages to one peer land in the same bucket.
impl Hash for LinkMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.remote.hash(state);
    }
}

fn node_field(map: &WireMap, key: &str, opts: &DecodeOptions) -> DecodeResult<Option<NodeInfo>> {
    let found = map_field(map, key).and_then(|m| m.map(NodeInfo::from_wire_map).transpose());
    policy_field(found, key, opts)
}

impl WireCodec for LinkMessage {
    fn to_wire(&self) -> WireValue {
        let mut map = WireMap::new();
        if let Some(local) = &self.local {
            map.insert("local".into(), local.to_wire());
        }
        if let Some(remote) = &self.remote {
            map.insert("remote".into(), remote.to_wire());
        }
        map.insert("token".into(), self.token.as_str().into());
        for (k, v) in self.attributes.iter() {
            map.insert(k.to_string(), v.into());
        }
        WireValue::Map(map)
    }

    fn from_wire_with(value: &WireValue, opts: &DecodeOptions) -> DecodeResult<Self> {
        let map = value.expect_map("link message")?;

        let local = node_field(map, "local", opts)?;
        let remote = node_field(map, "remote", opts)?;
        let token = policy_field(str_field(map, "token"), "token", opts)?
            .map(Token::from)
            .unwrap_or_default();
        opts.check_token(&token)?;

        let mut connection_type = None;
        let mut extra = BTreeMap::new();
        for (key, entry) in map {
            if matches!(key.as_str(), "local" | "remote" | "token") {
                continue;
            }
            let text = match entry.as_str() {
                Some(s) => s.to_string(),
                None if opts.is_lenient() => continue,
                None => {
                    return Err(DecodeError::WrongShape {
                        field: key.clone(),
                        expected: "string",
                    })
                }
            };
            if key == "type" {
                connection_type = Some(text);
            } else {
                extra.insert(key.clone(), text);
            }
        }
        let connection_type = policy_field(Ok(connection_type), "type", opts)?.unwrap_or_default();

        Ok(Self {
            attributes: LinkAttributes {
                connection_type,
                extra,
            },
            local,
            remote,
            token,
        })
    }
}
