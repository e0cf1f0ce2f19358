// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-facing re-exports of the shared domain types.
//!
//! The row shapes match the core types exactly; no storage-only structs
//! exist today.

pub use deskwire_core::types::{
    CompanyMessage, PrivateMessage, ReactionSet, Ticket, TicketMessage, TicketStatus,
    UserRecord,
};
