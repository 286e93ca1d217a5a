//! Core types for the dataspace bridge.
//!
//! This crate provides the protocol primitives: the instance address, the
//! handshake messages and the handshake state machine. Transport and UI
//! plumbing live elsewhere.

mod handshake;
mod identity;
mod message;

pub use handshake::{DuplicateReplyPolicy, HandshakeState, Reply};
pub use identity::{IdentityError, InstanceIdentity};
pub use message::{CHANNEL_APP, Message, MessageError, RawMessage};
