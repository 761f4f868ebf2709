//! # VIO Client
//!
//! A Rust client library for controlling an Analog Way VIO 4K video processor
//! over its TCP line protocol.
//!
//! ## Overview
//!
//! The central type is [`link::DeviceLink`]. It owns the TCP connection to the device,
//! reassembles response lines, interprets them and reports everything a user should
//! see to a [`Host`]. The host is whatever embeds the driver: a control surface, a UI
//! or the `vio-ctl` command line tool.
//!
//! ## Connection Handshake
//!
//! After connecting, the link performs the handshake of the device on its own:
//!
//! 1. An empty command is sent, the device answers with its controller count (`TPcon<n>`)
//! 2. If there is room for this controller, the model is queried (`?` → `DEV<n>`)
//! 3. If the device is a VIO 4K, its command set version is requested (`0,TPver`)
//!
//! The link closes the connection by itself when too many controllers are connected
//! or when the device is not a VIO 4K. It never reconnects on its own; the next
//! [`send`](link::DeviceLink::send) does.
//!
//! For detailed protocol information, see the [`vio_protocol`] crate.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use vio_client::{LogHost, link::Builder};
//! use vio_protocol::Action;
//!
//! let mut link = Builder::new().host("192.168.2.140").build(LogHost);
//! link.connect().await?;
//!
//! // Drive the handshake
//! link.poll().await?;
//!
//! link.execute(&Action::RecallPreset(3)).await?;
//! link.teardown().await;
//! ```
//!
//! ## Logging
//!
//! Messages meant for the user go through [`Host::log`]. Diagnostics such as sent
//! commands and received lines are emitted through the `log` crate.
pub mod error;
pub mod link;

use std::fmt::Display;

/// Name of the driver as shown to users.
pub const MODULE_LABEL: &str = "Analog Way VIO 4K";
/// Identifier of the driver.
pub const MODULE_ID: &str = "analogway_vio";

/// State of the connection to the device.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum LinkState {
    /// Not connected. This is also the state after the link closed the connection itself.
    #[default]
    Idle,
    Connecting,
    Connected,
    /// The connection failed or broke down.
    Error,
}

impl Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Idle => write!(f, "idle"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Error => write!(f, "error"),
        }
    }
}

/// Severity of a message for the user.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// The environment embedding the driver.
///
/// The link reports state changes and user facing messages to the host.
/// Both methods are called from within the link's own methods, so they
/// must not block.
pub trait Host {
    /// The connection changed its state.
    fn status(&mut self, state: LinkState, message: Option<&str>);

    /// A message for the user.
    fn log(&mut self, level: Level, message: &str);
}

/// Host that forwards everything to the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHost;

impl Host for LogHost {
    fn status(&mut self, state: LinkState, message: Option<&str>) {
        match (state, message) {
            (LinkState::Error, Some(message)) => log::error!("Link {}: {}", state, message),
            (_, Some(message)) => log::info!("Link {}: {}", state, message),
            (_, None) => log::info!("Link {}", state),
        }
    }

    fn log(&mut self, level: Level, message: &str) {
        match level {
            Level::Info => log::info!("{}", message),
            Level::Warning => log::warn!("{}", message),
            Level::Error => log::error!("{}", message),
        }
    }
}
