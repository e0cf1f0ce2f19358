// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory engine for the Deskwire support desk.
//!
//! Owns the authoritative runtime state: the ticket store, the presence
//! directory, and the permission directory, plus the private message
//! relay and capability token signing. Everything here is transport
//! agnostic; the realtime gateway drives it.

pub mod permissions;
pub mod presence;
pub mod private_chat;
pub mod ticket_store;
pub mod token;

pub use permissions::PermissionDirectory;
pub use presence::{Announce, PresenceDirectory};
pub use private_chat::PrivateChatRelay;
pub use ticket_store::TicketStore;
pub use token::{CapabilityToken, TokenClaims, TokenSigner};
