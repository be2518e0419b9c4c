//! Integration tests for the handshake payloads and sender resolution.
//!
//! A mock `ah` routing strategy is registered in a registry; it captures
//! every payload handed to it. The tests drive a connect-to / link exchange
//! through it and check that the far side reconstructs equal messages and
//! can correlate them by token.

use meshlink_types::{
    Address, ConnectionType, DecodeOptions, NodeInfo, ProtocolConfig, Token, TransportAddress,
    WireValue,
};
use meshlink_wire::{
    decode_frame, decode_length, encode_frame, AhDescriptor, AhMode, BoxError, ConnectToMessage,
    LinkAttributes, LinkMessage, Sender, SenderContext, SenderError, SenderRegistry, WireCodec,
};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Mock routing strategy — records what it was asked to send
// ---------------------------------------------------------------------------

type Outbox = Arc<Mutex<Vec<(String, WireValue)>>>;

#[derive(Debug)]
struct MockAhSender {
    descriptor: AhDescriptor,
    outbox: Outbox,
}

impl Sender for MockAhSender {
    fn send(&self, payload: &WireValue) -> Result<(), BoxError> {
        self.outbox
            .lock()
            .unwrap()
            .push((self.descriptor.dest.to_string(), payload.clone()));
        Ok(())
    }

    fn to_uri(&self) -> String {
        self.descriptor.to_uri()
    }
}

/// The context a node hands to constructors.
struct LocalNode {
    outbox: Outbox,
}

fn registry_with_ah() -> SenderRegistry {
    let registry = SenderRegistry::new();
    registry.register("ah", |ctx: &SenderContext, uri: &str| -> Result<Arc<dyn Sender>, BoxError> {
        let node = ctx
            .downcast_ref::<LocalNode>()
            .ok_or("context is not a LocalNode")?;
        let descriptor = AhDescriptor::from_uri(uri)?;
        Ok(Arc::new(MockAhSender {
            descriptor,
            outbox: Arc::clone(&node.outbox),
        }))
    })
    .unwrap();
    registry
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn addr(s: &str) -> Address {
    Address::parse(&format!("brunet:node:{s}")).unwrap()
}

fn node(name: &str, port: u16) -> NodeInfo {
    NodeInfo::single(
        Some(addr(name)),
        TransportAddress::parse(&format!("brunet.udp://192.168.1.10:{port}")).unwrap(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_connect_to_then_link_exchange() {
    init_tracing();
    let registry = registry_with_ah();
    let local = LocalNode {
        outbox: Arc::new(Mutex::new(Vec::new())),
    };

    // Node A asks B to connect back, naming itself as target.
    let a = node("AAAA", 4000);
    let b = node("BBBB", 4001);
    let token = Token::random();
    let neighbors = vec![node("N0", 5000), node("N1", 5001), node("N2", 5002)];
    let ctm = ConnectToMessage::with_neighbors("structured", a.clone(), neighbors, token.clone());

    let uri = AhDescriptor {
        dest: addr("BBBB"),
        mode: AhMode::Exact,
    }
    .to_uri();
    let sender = registry.resolve(&local, &uri).unwrap();
    assert_eq!(sender.to_uri(), uri);
    sender.send(&ctm.to_wire()).unwrap();

    let (dest, payload) = local.outbox.lock().unwrap().pop().unwrap();
    assert_eq!(dest, "brunet:node:BBBB");
    let received = ConnectToMessage::from_wire(&payload).unwrap();
    assert_eq!(received, ctm);
    assert_eq!(received.target(), &a);
    assert_eq!(received.neighbors().len(), 3);

    // B replies with a link request carrying the same token.
    let link = LinkMessage::new(
        received.connection_type().unwrap(),
        b.clone(),
        received.target().clone(),
        received.token().clone(),
    );
    let reply_uri = AhDescriptor {
        dest: received.target().address().unwrap().clone(),
        mode: AhMode::Greedy,
    }
    .to_uri();
    registry
        .resolve(&local, &reply_uri)
        .unwrap()
        .send(&link.to_wire())
        .unwrap();

    let (dest, payload) = local.outbox.lock().unwrap().pop().unwrap();
    assert_eq!(dest, "brunet:node:AAAA");
    let got = LinkMessage::from_wire(&payload).unwrap();
    assert_eq!(got, link);
    assert_eq!(got.token(), &token);
    assert_eq!(got.remote(), Some(&a));
    assert_eq!(got.connection_type().unwrap(), ConnectionType::Structured);
}

#[test]
fn test_resolution_failures() {
    init_tracing();
    let registry = registry_with_ah();
    let local = LocalNode {
        outbox: Arc::new(Mutex::new(Vec::new())),
    };

    // Known scheme, but the constructor rejects the options.
    let err = registry
        .resolve(&local, "sender:ah?dest=brunet:node:X&mode=teleport")
        .unwrap_err();
    match &err {
        SenderError::Resolution { uri, source } => {
            assert_eq!(uri, "sender:ah?dest=brunet:node:X&mode=teleport");
            assert!(source.to_string().contains("mode"));
        }
        other => panic!("Expected Resolution, got {other:?}"),
    }

    // Wrong context type.
    let err = registry
        .resolve(&"not a node", "sender:ah?dest=brunet:node:X&mode=exact")
        .unwrap_err();
    assert!(matches!(err, SenderError::Resolution { .. }));

    // Unknown scheme.
    let err = registry
        .resolve(&local, "sender:fw?relay=brunet:node:R")
        .unwrap_err();
    assert!(matches!(err, SenderError::MalformedDescriptor { .. }));
}

#[test]
fn test_framed_exchange_with_config() {
    let cfg = ProtocolConfig::from_toml_str(
        r#"
        [decode]
        allow_empty_token = false

        [frame]
        max_frame_size = 65536
        "#,
    )
    .unwrap();

    let attrs = LinkAttributes::new("structured.near")
        .with("realm", "testnet")
        .unwrap();
    let lm = LinkMessage::with_attributes(attrs, node("A", 1), node("B", 2), "tok-1".into());
    let bytes = encode_frame(&lm, cfg.frame.max_frame_size).unwrap();
    let len = decode_length(&[bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let back: LinkMessage =
        decode_frame(&bytes[4..4 + len], cfg.frame.max_frame_size, &cfg.decode).unwrap();
    assert_eq!(back, lm);

    let anonymous = LinkMessage::new(
        ConnectionType::Leaf,
        node("A", 1),
        node("B", 2),
        Token::default(),
    );
    let bytes = encode_frame(&anonymous, cfg.frame.max_frame_size).unwrap();
    assert!(decode_frame::<LinkMessage>(&bytes[4..], cfg.frame.max_frame_size, &cfg.decode).is_err());
    assert!(
        decode_frame::<LinkMessage>(&bytes[4..], cfg.frame.max_frame_size, &DecodeOptions::default())
            .is_ok()
    );
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

fn arb_node() -> impl Strategy<Value = NodeInfo> {
    (
        proptest::option::of("[A-Z2-7]{4,32}"),
        proptest::collection::vec(1u16..65535, 0..4),
    )
        .prop_map(|(name, ports)| {
            let address = name.map(|n| addr(&n));
            let endpoints = ports
                .into_iter()
                .map(|p| TransportAddress::parse(&format!("brunet.tcp://10.0.0.1:{p}")).unwrap())
                .collect();
            NodeInfo::new(address, endpoints)
        })
}

proptest! {
    #[test]
    fn prop_link_message_roundtrip(
        local in arb_node(),
        remote in arb_node(),
        token in ".{0,40}",
        ct in "(leaf|structured|unstructured)(\\.[a-z]{1,8})?",
        extra in proptest::collection::btree_map("[a-z_]{1,10}", ".{0,20}", 0..4),
    ) {
        let mut attrs = LinkAttributes::new(ct);
        for (k, v) in extra {
            // Reserved keys are refused here and simply left out.
            let _ = attrs.insert(k, v);
        }
        let lm = LinkMessage::with_attributes(attrs, local, remote, Token::new(token));
        let back = LinkMessage::from_wire(&lm.to_wire()).unwrap();
        prop_assert_eq!(back, lm);
    }

    #[test]
    fn prop_connect_to_roundtrip(
        target in arb_node(),
        neighbors in proptest::collection::vec(arb_node(), 0..6),
        token in ".{0,40}",
    ) {
        let ctm = ConnectToMessage::with_neighbors("unstructured", target, neighbors, Token::new(token));
        let back = ConnectToMessage::from_wire(&ctm.to_wire()).unwrap();
        prop_assert_eq!(back.neighbors(), ctm.neighbors());
        prop_assert_eq!(back, ctm);
    }
}
