//! Websocket transport.
//!
//! One text frame carries one envelope, in both directions:
//! `{"target": "<channel>", "message": {...}}`.

use crate::{ClientError, DataspaceClient, Delivery, RetryPolicy};
use dataspace_core::Message;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Serialize)]
struct Envelope<'a> {
    target: &'a str,
    message: &'a Message,
}

/// Dataspace client over a websocket, reconnecting on failed sends.
///
/// A reconnect is never hidden: the send that triggered it returns
/// [`ClientError::Reconnected`] without being resent, since the new socket
/// is unregistered. A frame written into a socket the peer has already
/// dropped can still report success and be lost; the failure only shows on
/// a later send.
pub struct WsDataspaceClient {
    url: String,
    retry: RetryPolicy,
    socket: Socket,
}

impl WsDataspaceClient {
    /// Connect to the dataspace at `url` (e.g. `wss://ds1.pisys.eu`).
    pub async fn connect(url: impl Into<String>, retry: RetryPolicy) -> Result<Self, ClientError> {
        let url = url.into();
        let socket = open(&url).await?;
        tracing::info!("Connected to dataspace at {}", url);
        Ok(Self { url, retry, socket })
    }

    async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.socket = open(&self.url).await?;
        tracing::info!("Reconnected to dataspace at {}", self.url);
        Ok(())
    }
}

async fn open(url: &str) -> Result<Socket, ClientError> {
    let (socket, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|source| ClientError::Connect {
            url: url.to_string(),
            source,
        })?;
    Ok(socket)
}

fn encode(channel: &str, message: &Message) -> Result<String, ClientError> {
    let envelope = Envelope {
        target: channel,
        message,
    };
    Ok(serde_json::to_string(&envelope)?)
}

impl DataspaceClient for WsDataspaceClient {
    async fn send(&mut self, channel: &str, message: &Message) -> Result<(), ClientError> {
        let text = encode(channel, message)?;
        let mut last = match self.socket.send(Frame::Text(text.into())).await {
            Ok(()) => return Ok(()),
            Err(e) => e.to_string(),
        };

        for retry in 1..self.retry.max_attempts {
            let delay = self.retry.delay_for(retry);
            tracing::warn!(retry, ?delay, "Send failed, reconnecting: {}", last);
            tokio::time::sleep(delay).await;
            match self.reconnect().await {
                Ok(()) => return Err(ClientError::Reconnected),
                Err(e) => last = e.to_string(),
            }
        }

        Err(ClientError::RetriesExhausted {
            attempts: self.retry.max_attempts,
            last,
        })
    }

    async fn recv(&mut self) -> Option<Result<Delivery, ClientError>> {
        loop {
            let frame = match self.socket.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };

            match frame {
                Frame::Text(text) => match serde_json::from_str::<Delivery>(&text) {
                    Ok(delivery) => return Some(Ok(delivery)),
                    Err(e) => {
                        tracing::warn!("Invalid envelope: {}", e);
                        continue;
                    }
                },
                Frame::Close(_) => return None,
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
        }
    }

    async fn first_text(ws: &mut WebSocketStream<TcpStream>) -> serde_json::Value {
        loop {
            if let Some(Ok(Frame::Text(text))) = ws.next().await {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    /// Keep sending until the dropped connection shows up as an error.
    async fn send_until_err(client: &mut WsDataspaceClient) -> ClientError {
        for n in 0..50 {
            let ping = Message::outbound(json!({ "type": "ping", "n": n })).unwrap();
            if let Err(e) = client.send("app", &ping).await {
                return e;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("dropped connection never surfaced as a send error");
    }

    /// Accept one connection, assert on the first frame, then reply.
    async fn serve_once(listener: TcpListener, replies: Vec<String>) -> serde_json::Value {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let first = first_text(&mut ws).await;
        for reply in replies {
            ws.send(Frame::Text(reply.into())).await.unwrap();
        }
        ws.close(None).await.unwrap();
        first
    }

    #[tokio::test]
    async fn sends_envelope_and_receives_deliveries() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(
            listener,
            vec![
                "not json".to_string(),
                json!({ "target": "app", "message": { "type": "registered" } }).to_string(),
            ],
        ));

        let mut client = WsDataspaceClient::connect(url, RetryPolicy::none())
            .await
            .unwrap();
        let ping = Message::outbound(json!({ "type": "ping" })).unwrap();
        client.send("app", &ping).await.unwrap();

        let delivery = client.recv().await.unwrap().unwrap();
        assert_eq!(delivery.target, "app");
        assert_eq!(delivery.message, json!({ "type": "registered" }));
        assert!(client.recv().await.is_none());

        let first = server.await.unwrap();
        assert_eq!(first, json!({ "target": "app", "message": { "type": "ping" } }));
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = WsDataspaceClient::connect(url, RetryPolicy::none())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::Connect { .. }));
    }

    #[tokio::test]
    async fn failed_send_reconnects_without_resending() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let first = first_text(&mut ws).await;
            drop(ws);

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            (first, first_text(&mut ws).await)
        });

        let mut client = WsDataspaceClient::connect(url, fast_retry(3)).await.unwrap();
        let hello = Message::outbound(json!({ "type": "hello" })).unwrap();
        client.send("app", &hello).await.unwrap();

        let err = send_until_err(&mut client).await;
        assert!(matches!(err, ClientError::Reconnected), "got {err}");

        let after = Message::outbound(json!({ "type": "after" })).unwrap();
        client.send("app", &after).await.unwrap();

        let (first, second) = server.await.unwrap();
        assert_eq!(first["message"]["type"], "hello");
        assert_eq!(second, json!({ "target": "app", "message": { "type": "after" } }));
    }

    #[tokio::test]
    async fn retries_exhausted_when_dataspace_is_gone() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            drop(ws);
            drop(listener);
        });

        let mut client = WsDataspaceClient::connect(url, fast_retry(3)).await.unwrap();
        server.await.unwrap();

        let err = send_until_err(&mut client).await;
        assert!(
            matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }),
            "got {err}"
        );
    }
}
