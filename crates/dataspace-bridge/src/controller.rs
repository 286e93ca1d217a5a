//! Bridge controller.
//!
//! Owns the instance identity and the handshake, and relays messages between
//! the UI and the dataspace. Both directions are served by one task, so each
//! event is handled to completion before the next one.

use crate::config::BridgeConfig;
use crate::names::{NameError, NameGenerator};
use crate::ui::{UiChannels, UiError, UiPort};
use dataspace_client::{ClientError, DataspaceClient, Delivery};
use dataspace_core::{CHANNEL_APP, HandshakeState, IdentityError, InstanceIdentity, Message, Reply};
use serde_json::Value;
use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Reconnects tolerated while delivering a single message.
const MAX_RECONNECTS: u32 = 3;

/// Drives one instance's handshake and relays its traffic.
///
/// Generic over the transport so tests can script the dataspace.
pub struct BridgeController<C> {
    config: BridgeConfig,
    identity: InstanceIdentity,
    state: HandshakeState,
    client: C,
    ui_outbound: mpsc::Receiver<Value>,
    ui_inbound: mpsc::Sender<Message>,
    handshake_deadline: Option<Instant>,
}

impl<C: DataspaceClient> BridgeController<C> {
    /// Pick an identity, start the UI with it and send `register`.
    pub async fn start<G, U>(
        config: BridgeConfig,
        names: &mut G,
        ui: U,
        client: C,
    ) -> Result<Self, BridgeError>
    where
        G: NameGenerator + ?Sized,
        U: UiPort,
    {
        let token = names.generate()?;
        let identity = InstanceIdentity::new(config.dataspace_host.clone(), token)?;
        tracing::info!("Instance identity: {}", identity);

        let UiChannels { outbound, inbound } = ui.start(identity.clone())?;

        let mut controller = Self {
            config,
            identity,
            state: HandshakeState::Unregistered,
            client,
            ui_outbound: outbound,
            ui_inbound: inbound,
            handshake_deadline: None,
        };

        let register = Message::Register {
            uri: controller.identity.clone(),
        };
        controller.send(&register).await?;
        controller.register_sent();
        tracing::info!("Registering {} with {}", controller.identity, controller.config.dataspace_host);

        Ok(controller)
    }

    /// The address this instance registered under.
    pub fn identity(&self) -> &InstanceIdentity {
        &self.identity
    }

    /// Current handshake state, for diagnostics.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Relay messages until `shutdown` resolves or either side goes away.
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), BridgeError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let deadline = self
                .handshake_deadline
                .filter(|_| self.state.is_awaiting_reply());

            let flow = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutting down bridge");
                    ControlFlow::Break(())
                }

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let timeout = self.config.handshake_timeout().unwrap_or_default();
                    return Err(BridgeError::HandshakeTimeout(timeout));
                }

                // Outbound from the UI
                msg = self.ui_outbound.recv() => match msg {
                    Some(value) => {
                        self.on_outbound(value).await?;
                        ControlFlow::Continue(())
                    }
                    None => {
                        tracing::info!("UI closed its outbound stream");
                        ControlFlow::Break(())
                    }
                },

                // Inbound from the dataspace
                delivery = self.client.recv() => match delivery {
                    Some(Ok(delivery)) => self.on_inbound(delivery).await?,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(BridgeError::DataspaceClosed),
                },
            };

            if flow.is_break() {
                return Ok(());
            }
        }
    }

    /// Forward one UI message to the dataspace, unchanged.
    pub async fn on_outbound(&mut self, value: Value) -> Result<(), BridgeError> {
        let message = match Message::outbound(value) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping UI message: {}", e);
                return Ok(());
            }
        };

        tracing::debug!(kind = message.kind(), "ui -> dataspace: {}", message.to_value());
        self.send(&message).await
    }

    /// Handle one delivery from the dataspace.
    ///
    /// `registered` drives the handshake and is never shown to the UI;
    /// everything else is delivered to the UI unchanged.
    pub async fn on_inbound(&mut self, delivery: Delivery) -> Result<ControlFlow<()>, BridgeError> {
        let message = match Message::inbound(delivery.message) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(channel = %delivery.target, "Dropping dataspace message: {}", e);
                return Ok(ControlFlow::Continue(()));
            }
        };

        if message == Message::Registered {
            match self.state.on_registered(self.config.duplicate_reply) {
                Reply::SendConnect => {
                    tracing::info!("Registered as {}, connecting", self.identity);
                    let connect = Message::Connect {
                        dataspace: self.config.dataspace_host.clone(),
                    };
                    self.send(&connect).await?;
                }
                Reply::Ignore => tracing::debug!("Ignoring duplicate registered reply"),
            }
            return Ok(ControlFlow::Continue(()));
        }

        self.state.on_inbound();
        tracing::debug!(
            channel = %delivery.target,
            kind = message.kind(),
            "dataspace -> ui: {}",
            message.to_value()
        );

        if self.ui_inbound.send(message).await.is_err() {
            tracing::info!("UI closed its inbound sink");
            return Ok(ControlFlow::Break(()));
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Send tagged `app`. If the transport reconnects, register on the new
    /// connection first; a pending `register` or `connect` is then dropped,
    /// since the handshake starts over.
    async fn send(&mut self, message: &Message) -> Result<(), BridgeError> {
        let mut reconnects = 0;
        let mut register_first = false;

        loop {
            if register_first {
                let register = Message::Register {
                    uri: self.identity.clone(),
                };
                match self.client.send(CHANNEL_APP, &register).await {
                    Ok(()) => self.register_sent(),
                    Err(ClientError::Reconnected) if reconnects < MAX_RECONNECTS => {
                        reconnects += 1;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
                if matches!(message, Message::Register { .. } | Message::Connect { .. }) {
                    return Ok(());
                }
                register_first = false;
            }

            match self.client.send(CHANNEL_APP, message).await {
                Ok(()) => return Ok(()),
                Err(ClientError::Reconnected) if reconnects < MAX_RECONNECTS => {
                    reconnects += 1;
                    tracing::warn!("Dataspace connection replaced, registering {} again", self.identity);
                    self.state.on_reconnected();
                    register_first = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// `register` is on the wire; (re)start the reply deadline.
    fn register_sent(&mut self) {
        self.state.on_register_sent();
        self.handshake_deadline = self
            .config
            .handshake_timeout()
            .map(|t| Instant::now() + t);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("identity generation failed: {0}")]
    Name(#[from] NameError),
    #[error("invalid instance identity: {0}")]
    Identity(#[from] IdentityError),
    #[error("failed to start UI: {0}")]
    Ui(#[from] UiError),
    #[error(transparent)]
    Transport(#[from] ClientError),
    #[error("dataspace closed the connection")]
    DataspaceClosed,
    #[error("no 'registered' reply within {0:?}")]
    HandshakeTimeout(Duration),
}
