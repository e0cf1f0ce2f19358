// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp channel gateway for the Deskwire support desk.
//!
//! Implements [`ChannelGateway`] against a local WhatsApp bridge sidecar
//! over HTTP: a poll loop tracks bridge connectivity and drains inbound
//! messages, while outbound sends are bounded by the configured timeout
//! and fail fast whenever the bridge session is not authenticated.

pub mod normalize;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use deskwire_config::model::WhatsappConfig;
use deskwire_core::DeskwireError;
use deskwire_core::traits::{ChannelGateway, PluginAdapter};
use deskwire_core::types::{AdapterType, HealthStatus, InboundChat};

use normalize::BridgeMessage;

/// Connectivity report from the bridge's status endpoint.
#[derive(Debug, Deserialize)]
struct BridgeStatus {
    connected: bool,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: String,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    sent: bool,
}

/// Bridge-backed WhatsApp gateway implementing [`ChannelGateway`].
pub struct WhatsappGateway {
    config: WhatsappConfig,
    base_url: String,
    http: reqwest::Client,
    inbound_tx: mpsc::Sender<InboundChat>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundChat>>,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
    poll_handle: Option<tokio::task::JoinHandle<()>>,
}

impl WhatsappGateway {
    /// Creates a new gateway. Requires `whatsapp.bridge_url` to be set.
    pub fn new(config: WhatsappConfig) -> Result<Self, DeskwireError> {
        let base_url = config
            .bridge_url
            .as_deref()
            .ok_or_else(|| {
                DeskwireError::Config(
                    "whatsapp.bridge_url is required for the WhatsApp gateway".into(),
                )
            })?
            .trim_end_matches('/')
            .to_string();

        let (inbound_tx, inbound_rx) = mpsc::channel(100);
        let (ready_tx, ready_rx) = watch::channel(false);

        Ok(Self {
            config,
            base_url,
            http: reqwest::Client::new(),
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            ready_tx,
            ready_rx,
            cancel: CancellationToken::new(),
            poll_handle: None,
        })
    }

    async fn poll_once(
        http: &reqwest::Client,
        base_url: &str,
        ready_tx: &watch::Sender<bool>,
        inbound_tx: &mpsc::Sender<InboundChat>,
    ) -> bool {
        let connected = match http.get(format!("{base_url}/status")).send().await {
            Ok(response) => response
                .json::<BridgeStatus>()
                .await
                .map(|s| s.connected)
                .unwrap_or(false),
            Err(e) => {
                debug!(error = %e, "bridge status poll failed");
                false
            }
        };
        ready_tx.send_replace(connected);
        if !connected {
            return true;
        }

        match http.get(format!("{base_url}/messages")).send().await {
            Ok(response) => match response.json::<Vec<BridgeMessage>>().await {
                Ok(raws) => {
                    for raw in &raws {
                        if let Some(chat) = normalize::normalize(raw) {
                            if inbound_tx.send(chat).await.is_err() {
                                // Receiver dropped: the desk is shutting down.
                                return false;
                            }
                        }
                    }
                }
                Err(e) => warn!(error = %e, "bridge returned malformed message batch"),
            },
            Err(e) => debug!(error = %e, "bridge message poll failed"),
        }
        true
    }
}

#[async_trait]
impl PluginAdapter for WhatsappGateway {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, DeskwireError> {
        if self.is_ready() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(
                "bridge session not authenticated".into(),
            ))
        }
    }

    async fn shutdown(&self) -> Result<(), DeskwireError> {
        debug!("WhatsApp gateway shutting down");
        self.cancel.cancel();
        Ok(())
    }
}

#[async_trait]
impl ChannelGateway for WhatsappGateway {
    async fn connect(&mut self) -> Result<(), DeskwireError> {
        if self.poll_handle.is_some() {
            return Ok(()); // Already connected
        }

        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let ready_tx = self.ready_tx.clone();
        let inbound_tx = self.inbound_tx.clone();
        let cancel = self.cancel.clone();
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        info!(base_url = %self.base_url, "starting WhatsApp bridge poll loop");

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if !Self::poll_once(&http, &base_url, &ready_tx, &inbound_tx).await {
                    break;
                }
            }
            ready_tx.send_replace(false);
        });

        self.poll_handle = Some(handle);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<bool, DeskwireError> {
        if !self.is_ready() {
            return Err(DeskwireError::ChannelNotReady);
        }

        let timeout = Duration::from_millis(self.config.send_timeout_ms);
        let request = self
            .http
            .post(format!("{}/send", self.base_url))
            .json(&SendRequest {
                to: format!("{conversation_id}@c.us"),
                body: text,
            })
            .send();

        let response = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| DeskwireError::Timeout { duration: timeout })?
            .map_err(|e| DeskwireError::Channel {
                message: format!("bridge send to {conversation_id} failed"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            warn!(conversation_id, status = %response.status(), "bridge rejected send");
            return Ok(false);
        }
        let accepted = response
            .json::<SendResponse>()
            .await
            .map(|r| r.sent)
            .unwrap_or(false);
        Ok(accepted)
    }

    async fn receive(&self) -> Result<InboundChat, DeskwireError> {
        self.inbound_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| DeskwireError::Channel {
                message: "inbound channel closed".into(),
                source: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bridge_url: Option<&str>) -> WhatsappConfig {
        WhatsappConfig {
            bridge_url: bridge_url.map(String::from),
            poll_interval_ms: 10,
            send_timeout_ms: 100,
        }
    }

    #[test]
    fn missing_bridge_url_is_a_config_error() {
        assert!(matches!(
            WhatsappGateway::new(config(None)),
            Err(DeskwireError::Config(_))
        ));
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let gateway = WhatsappGateway::new(config(Some("http://127.0.0.1:3000/"))).unwrap();
        assert_eq!(gateway.base_url, "http://127.0.0.1:3000");
    }

    #[tokio::test]
    async fn send_before_ready_fails_fast() {
        let gateway = WhatsappGateway::new(config(Some("http://127.0.0.1:3000"))).unwrap();
        assert!(!gateway.is_ready());
        assert!(matches!(
            gateway.send_message("5511999990000", "hello").await,
            Err(DeskwireError::ChannelNotReady)
        ));
    }

    #[tokio::test]
    async fn shutdown_stops_the_poll_loop() {
        let mut gateway = WhatsappGateway::new(config(Some("http://127.0.0.1:1"))).unwrap();
        gateway.connect().await.unwrap();
        gateway.shutdown().await.unwrap();

        let handle = gateway.poll_handle.take().unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poll loop should exit after cancel")
            .unwrap();
    }
}
