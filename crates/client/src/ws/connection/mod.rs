//! One WebSocket speaking the `graphql-transport-ws` subprotocol.
//!
//! This module provides the shared types and conditionally includes
//! the platform-specific implementation. There is no reconnect: a closed
//! socket ends whatever ran over it.

use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;

/// What the socket reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    Opened,
    Message(String),
    Closed { reason: Option<String> },
}

/// Text frames out, [`WsEvent`]s in.
pub struct WsConnection {
    sender: UnboundedSender<String>,
    events: UnboundedReceiver<WsEvent>,
}

impl WsConnection {
    pub(crate) fn from_channels(sender: UnboundedSender<String>, events: UnboundedReceiver<WsEvent>) -> Self {
        Self { sender, events }
    }

    /// Open a socket to `url` offering the `graphql-transport-ws` subprotocol.
    pub fn open(url: &str) -> Self {
        crate::log_info!("Opening subscription socket to {}", url);
        platform::open(url)
    }

    /// Queue a text frame. Fails once the socket is gone.
    pub fn send(&self, text: String) -> Result<(), String> {
        self.sender
            .unbounded_send(text)
            .map_err(|e| format!("Failed to send: {}", e))
    }

    pub async fn next_event(&mut self) -> Option<WsEvent> {
        self.events.next().await
    }

    /// Stop sending; the socket closes once queued frames are flushed.
    pub fn close(&self) {
        self.sender.close_channel();
    }
}

// Include platform-specific implementation
#[cfg(target_arch = "wasm32")]
#[path = "connection_wasm.rs"]
mod platform;

#[cfg(not(target_arch = "wasm32"))]
#[path = "connection_native.rs"]
mod platform;
