// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime HTTP/WebSocket dispatcher for the Deskwire support desk.
//!
//! Binds the in-memory stores to connected desk clients: snapshot replay
//! on connect, typed bidirectional events, best-effort broadcast fan-out,
//! and deterministic presence cleanup on disconnect.

pub mod auth;
pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod ws;

pub use auth::AuthConfig;
pub use protocol::{ClientEvent, PresenceInfo, ServerEvent};
pub use server::{GatewayState, HealthState, ServerConfig, build_router, start_server};
