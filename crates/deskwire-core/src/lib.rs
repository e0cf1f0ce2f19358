// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Deskwire support desk.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Deskwire workspace. The channel gateway
//! and storage backends implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DeskwireError;
pub use types::{AdapterType, AvailabilityStatus, HealthStatus, Permission, Role, TicketStatus};

pub use traits::{ChannelGateway, PluginAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = DeskwireError::Config("test".into());
        let _storage = DeskwireError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = DeskwireError::Channel {
            message: "test".into(),
            source: None,
        };
        let _not_ready = DeskwireError::ChannelNotReady;
        let _not_found = DeskwireError::NotFound("test".into());
        let _integrity = DeskwireError::Integrity("test".into());
        let _timeout = DeskwireError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = DeskwireError::Internal("test".into());
    }

    #[test]
    fn adapter_type_display_roundtrip() {
        use std::str::FromStr;

        for variant in [AdapterType::Channel, AdapterType::Storage] {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn trait_seams_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_gateway<T: ChannelGateway>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
    }
}
