//! Connect-to requests.
//!
//! A node that wants more links sends a [`ConnectToMessage`] naming *itself*
//! as the target: the recipient is being asked to connect back to the
//! sender. The optional neighbor list advertises further peers the recipient
//! may want to link with.

use crate::message::{policy_field, WireCodec};
use meshlink_types::value::{list_field, map_field, str_field};
use meshlink_types::{
    ConnectionType, DecodeError, DecodeOptions, DecodeResult, NodeInfo, Token, WireMap, WireValue,
};
use std::hash::{Hash, Hasher};

/// A request that the recipient open a connection to `target`. Immutable.
///
/// The neighbor list is always present; it is empty when none were sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectToMessage {
    connection_type: String,
    target: NodeInfo,
    neighbors: Vec<NodeInfo>,
    token: Token,
}

impl ConnectToMessage {
    /// Build with a main connection type and no neighbors.
    pub fn new(ct: ConnectionType, target: NodeInfo, token: Token) -> Self {
        Self::with_type(ct.as_str(), target, token)
    }

    /// Build with a raw connection type string such as `structured.near`.
    pub fn with_type(connection_type: &str, target: NodeInfo, token: Token) -> Self {
        Self::with_neighbors(connection_type, target, Vec::new(), token)
    }

    /// Build with the sender's neighbors, in the order given.
    pub fn with_neighbors(
        connection_type: &str,
        target: NodeInfo,
        neighbors: Vec<NodeInfo>,
        token: Token,
    ) -> Self {
        Self {
            connection_type: connection_type.to_string(),
            target,
            neighbors,
            token,
        }
    }

    /// The main connection type, parsed from the raw type string.
    pub fn connection_type(&self) -> DecodeResult<ConnectionType> {
        ConnectionType::from_main_type(&self.connection_type)
    }

    /// The raw connection type string.
    pub fn connection_type_str(&self) -> &str {
        &self.connection_type
    }

    /// The node to connect to.
    pub fn target(&self) -> &NodeInfo {
        &self.target
    }

    /// The sender's neighbors, possibly empty.
    pub fn neighbors(&self) -> &[NodeInfo] {
        &self.neighbors
    }

    /// Correlates the eventual link handshake with this request.
    pub fn token(&self) -> &Token {
        &self.token
    }
}

/// Hashes `target` only; see the note on `LinkMessage`'s hash.
impl Hash for ConnectToMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target.hash(state);
    }
}

fn decode_neighbors(map: &WireMap, opts: &DecodeOptions) -> DecodeResult<Vec<NodeInfo>> {
    let items = match list_field(map, "neighbors") {
        Ok(Some(items)) => items,
        Ok(None) => return Ok(Vec::new()),
        Err(_) if opts.is_lenient() => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut neighbors = Vec::with_capacity(items.len());
    for item in items {
        match item.as_map().map(NodeInfo::from_wire_map) {
            Some(Ok(ni)) => neighbors.push(ni),
            _ if opts.is_lenient() => {}
            Some(Err(e)) => return Err(e),
            None => {
                return Err(DecodeError::WrongShape {
                    field: "neighbors".into(),
                    expected: "list of mappings",
                })
            }
        }
    }
    Ok(neighbors)
}

impl WireCodec for ConnectToMessage {
    fn to_wire(&self) -> WireValue {
        let mut map = WireMap::new();
        map.insert("type".into(), self.connection_type.as_str().into());
        map.insert("target".into(), self.target.to_wire());
        map.insert("token".into(), self.token.as_str().into());
        let neighbors = self.neighbors.iter().map(NodeInfo::to_wire).collect::<Vec<_>>();
        map.insert("neighbors".into(), neighbors.into());
        WireValue::Map(map)
    }

    fn from_wire_with(value: &WireValue, opts: &DecodeOptions) -> DecodeResult<Self> {
        let map = value.expect_map("connect-to message")?;

        // No usable default exists for the target, so it is required under
        // either policy.
        let target = map_field(map, "target")?
            .ok_or_else(|| DecodeError::MissingField("target".into()))
            .and_then(NodeInfo::from_wire_map)?;
        let connection_type = policy_field(str_field(map, "type"), "type", opts)?
            .unwrap_or_default()
            .to_string();
        let token = policy_field(str_field(map, "token"), "token", opts)?
            .map(Token::from)
            .unwrap_or_default();
        opts.check_token(&token)?;
        let neighbors = decode_neighbors(map, opts)?;

        Ok(Self {
            connection_type,
            target,
            neighbors,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlink_types::{Address, TransportAddress};

    fn ta(port: u16) -> TransportAddress {
        TransportAddress::parse(&format!("brunet.tcp://127.0.0.1:{port}")).unwrap()
    }

    fn target() -> NodeInfo {
        NodeInfo::single(Some(Address::parse("brunet:node:LEFT").unwrap()), ta(5000))
    }

    fn neighbors(n: u16) -> Vec<NodeInfo> {
        (0..n)
            .map(|i| {
                NodeInfo::single(
                    Some(Address::parse(&format!("brunet:node:N{i}")).unwrap()),
                    ta(80 + i),
                )
            })
            .collect()
    }

    fn roundtrip(ctm: &ConnectToMessage) -> ConnectToMessage {
        ConnectToMessage::from_wire(&ctm.to_wire()).unwrap()
    }

    #[test]
    fn test_roundtrip_without_neighbors() {
        let ctm = ConnectToMessage::new(ConnectionType::Unstructured, target(), Token::random());
        let wire = ctm.to_wire();
        let map = wire.as_map().unwrap();
        assert_eq!(map["neighbors"].as_list().unwrap().len(), 0);
        assert_eq!(map["type"].as_str(), Some("unstructured"));
        assert_eq!(roundtrip(&ctm), ctm);
    }

    #[test]
    fn test_roundtrip_many_transports() {
        let tas = (5000..5010).map(ta).collect();
        let ni = NodeInfo::new(Some(Address::parse("brunet:node:LEFT").unwrap()), tas);
        let ctm = ConnectToMessage::new(ConnectionType::Structured, ni, Token::random());
        let back = roundtrip(&ctm);
        assert_eq!(back.target().endpoints().len(), 10);
        assert_eq!(back, ctm);
    }

    #[test]
    fn test_neighbor_order_preserved() {
        let ctm = ConnectToMessage::with_neighbors("structured", target(), neighbors(5), "tok-2".into());
        let wire = ctm.to_wire();
        let listed = wire.as_map().unwrap()["neighbors"].as_list().unwrap();
        assert_eq!(listed.len(), 5);
        for (i, item) in listed.iter().enumerate() {
            let addr = item.as_map().unwrap()["address"].as_str().unwrap();
            assert_eq!(addr, format!("brunet:node:N{i}"));
        }
        let back = roundtrip(&ctm);
        assert_eq!(back.neighbors(), ctm.neighbors());
        assert_eq!(back, ctm);
    }

    #[test]
    fn test_neighbor_length_mismatch_is_unequal() {
        let short = ConnectToMessage::with_neighbors("structured", target(), neighbors(2), "t".into());
        let long = ConnectToMessage::with_neighbors("structured", target(), neighbors(3), "t".into());
        assert_ne!(short, long);
        assert_ne!(long, short);
    }

    #[test]
    fn test_neighbor_order_matters_for_equality() {
        let mut reversed = neighbors(3);
        reversed.reverse();
        let a = ConnectToMessage::with_neighbors("structured", target(), neighbors(3), "t".into());
        let b = ConnectToMessage::with_neighbors("structured", target(), reversed, "t".into());
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_neighbors_decodes_empty() {
        let ctm = ConnectToMessage::new(ConnectionType::Leaf, target(), "t".into());
        let mut map = ctm.to_wire().as_map().unwrap().clone();
        map.remove("neighbors");
        let back = ConnectToMessage::from_wire(&WireValue::Map(map)).unwrap();
        assert!(back.neighbors().is_empty());
        assert_eq!(back, ctm);
    }

    #[test]
    fn test_target_is_required() {
        let ctm = ConnectToMessage::new(ConnectionType::Leaf, target(), "t".into());
        let mut map = ctm.to_wire().as_map().unwrap().clone();
        map.remove("target");
        let value = WireValue::Map(map);
        assert_eq!(
            ConnectToMessage::from_wire(&value).unwrap_err(),
            DecodeError::MissingField("target".into())
        );
        assert!(ConnectToMessage::from_wire_with(&value, &DecodeOptions::lenient()).is_err());
    }

    #[test]
    fn test_strict_rejects_bad_neighbors() {
        let ctm = ConnectToMessage::with_neighbors("structured", target(), neighbors(2), "t".into());
        let mut map = ctm.to_wire().as_map().unwrap().clone();
        map.insert(
            "neighbors".into(),
            vec![target().to_wire(), WireValue::from("junk")].into(),
        );
        let value = WireValue::Map(map);
        assert!(matches!(
            ConnectToMessage::from_wire(&value),
            Err(DecodeError::WrongShape { .. })
        ));

        let lenient = ConnectToMessage::from_wire_with(&value, &DecodeOptions::lenient()).unwrap();
        assert_eq!(lenient.neighbors(), &[target()]);
    }

    #[test]
    fn test_lenient_tolerates_missing_token_and_type() {
        let mut map = WireMap::new();
        map.insert("target".into(), target().to_wire());
        map.insert("neighbors".into(), "not a list".into());
        let value = WireValue::Map(map);

        assert_eq!(
            ConnectToMessage::from_wire(&value).unwrap_err(),
            DecodeError::MissingField("type".into())
        );
        let ctm = ConnectToMessage::from_wire_with(&value, &DecodeOptions::lenient()).unwrap();
        assert_eq!(ctm.connection_type_str(), "");
        assert!(ctm.token().is_empty());
        assert!(ctm.neighbors().is_empty());
    }

    #[test]
    fn test_connection_type_accessor() {
        let ctm = ConnectToMessage::with_type("structured.shortcut", target(), "t".into());
        assert_eq!(ctm.connection_type().unwrap(), ConnectionType::Structured);
        let bad = ConnectToMessage::with_type("nope", target(), "t".into());
        assert!(matches!(
            bad.connection_type(),
            Err(DecodeError::UnknownConnectionType(_))
        ));
    }

    #[test]
    fn test_hash_uses_target() {
        use std::collections::hash_map::DefaultHasher;
        let hash = |m: &ConnectToMessage| {
            let mut h = DefaultHasher::new();
            m.hash(&mut h);
            h.finish()
        };
        let a = ConnectToMessage::new(ConnectionType::Leaf, target(), "a".into());
        let b = ConnectToMessage::new(ConnectionType::Structured, target(), "b".into());
        assert_ne!(a, b);
        assert_eq!(hash(&a), hash(&b));
        assert_eq!(hash(&a), hash(&roundtrip(&a)));
    }
}
