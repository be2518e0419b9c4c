//! meshlink control-plane protocol.
//!
//! Defines the messages nodes exchange while forming links, and the factory
//! that turns a sender descriptor into a way of delivering them.
//!
//! ## Architecture
//!
//! - **LinkMessage**: handshake payload carrying both sides' node info
//! - **ConnectToMessage**: request that the recipient connect back to the sender
//! - **WireCodec**: conversion to the wire value tree, plus length-prefixed framing
//! - **SenderRegistry**: scheme → constructor map resolving `sender:` URIs
//!
//! No I/O happens here. Routing strategies register their own schemes.

pub mod connect_to;
pub mod descriptor;
pub mod link;
pub mod message;
pub mod registry;
pub mod schemes;

pub use connect_to::ConnectToMessage;
pub use descriptor::{
    check_scheme, decode_uri, encode_uri, scheme_of, BoxError, DescriptorFault, SenderDescriptor,
    SenderError,
};
pub use link::{LinkAttributes, LinkMessage};
pub use message::{decode_frame, decode_length, encode_frame, FrameError, WireCodec};
pub use registry::{
    create_sender, register_sender, Sender, SenderConstructor, SenderContext, SenderRegistry,
};
pub use schemes::{AhDescriptor, AhMode, ForwardingDescriptor};
