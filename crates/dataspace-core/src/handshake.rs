//! Registration handshake: `register` -> `registered` -> `connect`.

use serde::{Deserialize, Serialize};

/// Handshake lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeState {
    /// Nothing sent yet.
    #[default]
    Unregistered,
    /// `register` sent, waiting for `registered`.
    Registering,
    /// `connect` sent.
    Connecting,
    /// Forwarding traffic after the handshake.
    Bridging,
}

/// What to do when `registered` arrives after `connect` was already sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReplyPolicy {
    /// Only the first `registered` sends `connect`.
    #[default]
    Ignore,
    /// Every `registered` sends another `connect`.
    Resend,
}

/// Reaction to a `registered` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Answer with `connect`.
    SendConnect,
    /// Already connecting; do nothing.
    Ignore,
}

impl HandshakeState {
    /// `register` went out.
    pub fn on_register_sent(&mut self) {
        if *self == Self::Unregistered {
            *self = Self::Registering;
        }
    }

    /// A `registered` reply arrived.
    pub fn on_registered(&mut self, policy: DuplicateReplyPolicy) -> Reply {
        match (*self, policy) {
            (Self::Unregistered | Self::Registering, _) => {
                *self = Self::Connecting;
                Reply::SendConnect
            }
            (_, DuplicateReplyPolicy::Resend) => Reply::SendConnect,
            (_, DuplicateReplyPolicy::Ignore) => Reply::Ignore,
        }
    }

    /// The transport was replaced; the new connection knows nothing of us.
    pub fn on_reconnected(&mut self) {
        *self = Self::Unregistered;
    }

    /// Any other inbound message arrived.
    pub fn on_inbound(&mut self) {
        if *self == Self::Connecting {
            *self = Self::Bridging;
        }
    }

    /// True until the first `registered` reply.
    pub fn is_awaiting_reply(&self) -> bool {
        matches!(self, Self::Unregistered | Self::Registering)
    }
}
