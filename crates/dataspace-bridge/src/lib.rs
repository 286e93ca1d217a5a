//! Dataspace bridge.
//!
//! Gives a running application a unique address in a dataspace, performs the
//! `register` / `registered` / `connect` handshake, then relays messages
//! between the application's UI ports and the dataspace's `app` channel.

pub mod config;
pub mod controller;
pub mod names;
pub mod ui;

pub use config::{BridgeConfig, Cli, ConfigError, RetryConfig};
pub use controller::{BridgeController, BridgeError};
pub use names::{FixedNameGenerator, NameError, NameGenerator, RandomNameGenerator};
pub use ui::{LineUi, StdioUi, UiChannels, UiError, UiPort};
