//! Dataspace client.
//!
//! The bridge talks to the dataspace only through [`DataspaceClient`]: send a
//! message on a channel, receive the next delivery. [`WsDataspaceClient`] is
//! the websocket implementation.

mod retry;
mod ws;

pub use retry::RetryPolicy;
pub use ws::WsDataspaceClient;

use dataspace_core::Message;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A message the dataspace delivered to this process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Channel the message was addressed to. Not used for routing.
    pub target: String,
    /// The message, not yet validated.
    pub message: serde_json::Value,
}

/// Transport to a dataspace.
pub trait DataspaceClient: Send {
    /// Send a message tagged with `channel`.
    ///
    /// [`ClientError::Reconnected`] means the transport was re-established
    /// and the caller must register again before resending.
    fn send(
        &mut self,
        channel: &str,
        message: &Message,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Wait for the next delivery. `None` once the transport has closed.
    fn recv(&mut self) -> impl Future<Output = Option<Result<Delivery, ClientError>>> + Send;
}

/// Transport failure.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("send failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
    /// The connection was replaced after a failed send. The message was not
    /// sent and the new connection is not registered.
    #[error("reconnected to dataspace, message not sent")]
    Reconnected,
}
