//! Application frontend boundary.
//!
//! A UI exposes two ports: an outbound stream of messages for the dataspace
//! and an inbound sink for messages coming from it.

use dataspace_core::{InstanceIdentity, Message};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// The two message ports of a running UI.
pub struct UiChannels {
    /// Messages the UI emits, unvalidated.
    pub outbound: mpsc::Receiver<Value>,
    /// Messages to deliver into the UI.
    pub inbound: mpsc::Sender<Message>,
}

/// An application frontend that can be started with an identity.
pub trait UiPort {
    fn start(self, identity: InstanceIdentity) -> Result<UiChannels, UiError>;
}

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("UI must be started inside a tokio runtime")]
    NoRuntime,
}

/// Newline-delimited JSON over a reader/writer pair.
///
/// The first line written is `{"type":"identity","uri":...}`; after that every
/// inbound message is one line. Every line read is one outbound message.
pub struct LineUi<R, W> {
    reader: R,
    writer: W,
    buffer: usize,
}

/// The binary's frontend: stdin in, stdout out.
pub type StdioUi = LineUi<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioUi {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineUi<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            buffer: 64,
        }
    }
}

impl<R, W> UiPort for LineUi<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn start(self, identity: InstanceIdentity) -> Result<UiChannels, UiError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| UiError::NoRuntime)?;

        let (outbound_tx, outbound) = mpsc::channel(self.buffer);
        let (inbound, inbound_rx) = mpsc::channel(self.buffer);

        runtime.spawn(read_lines(self.reader, outbound_tx));
        runtime.spawn(write_lines(self.writer, identity, inbound_rx));

        Ok(UiChannels { outbound, inbound })
    }
}

async fn read_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<Value>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("UI read error: {}", e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Invalid UI message: {}", e);
                continue;
            }
        };

        if tx.send(value).await.is_err() {
            break;
        }
    }
    tracing::debug!("UI outbound stream closed");
}

async fn write_lines<W: AsyncWrite + Unpin>(
    mut writer: W,
    identity: InstanceIdentity,
    mut rx: mpsc::Receiver<Message>,
) {
    let hello = json!({ "type": "identity", "uri": identity.as_uri() });
    if let Err(e) = write_line(&mut writer, &hello).await {
        tracing::warn!("UI write error: {}", e);
        return;
    }

    while let Some(message) = rx.recv().await {
        if let Err(e) = write_line(&mut writer, &message).await {
            tracing::warn!("UI write error: {}", e);
            return;
        }
    }
}

async fn write_line<W, T>(writer: &mut W, value: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}
