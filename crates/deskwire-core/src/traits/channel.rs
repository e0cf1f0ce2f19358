// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel gateway trait for the external messaging boundary.

use async_trait::async_trait;

use crate::error::DeskwireError;
use crate::traits::adapter::PluginAdapter;
use crate::types::InboundChat;

/// Boundary adapter to an external messaging network.
///
/// The gateway normalizes inbound traffic (filtering group conversations,
/// broadcast messages, and status updates before they reach the ticket
/// store), tracks connection readiness, and performs outbound sends.
#[async_trait]
pub trait ChannelGateway: PluginAdapter {
    /// Establishes the connection to the external network and starts the
    /// inbound event loop.
    async fn connect(&mut self) -> Result<(), DeskwireError>;

    /// Whether the channel has authenticated and can accept outbound sends.
    ///
    /// Until this returns true, `send_message` fails fast with
    /// [`DeskwireError::ChannelNotReady`] rather than queuing silently.
    fn is_ready(&self) -> bool;

    /// Sends a message to the given external conversation.
    ///
    /// Returns `Ok(true)` only on confirmed acceptance by the channel.
    /// A not-ready gateway returns an error, never a silent drop.
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<bool, DeskwireError>;

    /// Receives the next normalized inbound chat event.
    async fn receive(&self) -> Result<InboundChat, DeskwireError>;
}
