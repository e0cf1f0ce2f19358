// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel gateway for deterministic testing.
//!
//! `MockGateway` implements `ChannelGateway` with injectable inbound
//! chats and captured outbound sends for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use deskwire_core::traits::adapter::PluginAdapter;
use deskwire_core::traits::channel::ChannelGateway;
use deskwire_core::types::{AdapterType, HealthStatus, InboundChat};
use deskwire_core::DeskwireError;

/// A scriptable external messaging channel.
///
/// Provides two queues:
/// - **inbound**: chats injected via `inject_inbound()` are returned by `receive()`
/// - **sent**: `(conversation_id, text)` pairs captured from `send_message()`
pub struct MockGateway {
    inbound: Arc<Mutex<VecDeque<InboundChat>>>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
    notify: Arc<Notify>,
    ready: AtomicBool,
    reject_next: AtomicBool,
}

impl MockGateway {
    /// A new mock gateway, ready by default.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            ready: AtomicBool::new(true),
            reject_next: AtomicBool::new(false),
        }
    }

    /// Flip the readiness flag observed by `is_ready()`.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Make the next `send_message()` report rejection (`Ok(false)`).
    pub fn reject_next_send(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Inject an inbound chat into the receive queue.
    pub async fn inject_inbound(&self, chat: InboundChat) {
        self.inbound.lock().await.push_back(chat);
        self.notify.notify_one();
    }

    /// All `(conversation_id, text)` pairs accepted so far.
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, DeskwireError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DeskwireError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelGateway for MockGateway {
    async fn connect(&mut self) -> Result<(), DeskwireError> {
        self.set_ready(true);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<bool, DeskwireError> {
        if !self.is_ready() {
            return Err(DeskwireError::ChannelNotReady);
        }
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        self.sent
            .lock()
            .await
            .push((conversation_id.to_string(), text.to_string()));
        Ok(true)
    }

    async fn receive(&self) -> Result<InboundChat, DeskwireError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(chat) = queue.pop_front() {
                    return Ok(chat);
                }
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskwire_core::types::now_timestamp;

    fn chat(body: &str) -> InboundChat {
        InboundChat {
            conversation_id: "5511999990000".into(),
            body: body.into(),
            sender_name: "Customer".into(),
            sender_handle: "5511999990000".into(),
            timestamp: now_timestamp(),
        }
    }

    #[tokio::test]
    async fn receive_returns_injected_chats_in_order() {
        let gateway = MockGateway::new();
        gateway.inject_inbound(chat("first")).await;
        gateway.inject_inbound(chat("second")).await;

        assert_eq!(gateway.receive().await.unwrap().body, "first");
        assert_eq!(gateway.receive().await.unwrap().body, "second");
    }

    #[tokio::test]
    async fn sends_are_captured_only_when_accepted() {
        let gateway = MockGateway::new();
        gateway.reject_next_send();
        assert!(!gateway.send_message("c1", "dropped").await.unwrap());
        assert!(gateway.send_message("c1", "kept").await.unwrap());
        assert_eq!(gateway.sent().await, vec![("c1".to_string(), "kept".to_string())]);
    }

    #[tokio::test]
    async fn not_ready_gateway_fails_fast() {
        let gateway = MockGateway::new();
        gateway.set_ready(false);
        assert!(matches!(
            gateway.send_message("c1", "x").await,
            Err(DeskwireError::ChannelNotReady)
        ));
    }
}
