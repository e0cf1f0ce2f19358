// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Deskwire integration tests.
//!
//! Provides mock adapters and storage fixtures for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockGateway`] - scriptable channel gateway with inbound injection
//!   and outbound capture
//! - [`memory_storage`] / [`TestHarness`] - initialized SQLite fixtures

pub mod harness;
pub mod mock_gateway;

pub use harness::{TestHarness, memory_storage};
pub use mock_gateway::MockGateway;
