// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL query modules, one per table family.

pub mod company;
pub mod permissions;
pub mod private_messages;
pub mod tickets;
pub mod users;
