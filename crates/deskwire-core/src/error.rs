// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Deskwire support desk.

use thiserror::Error;

/// The primary error type used across all Deskwire adapter traits and core operations.
#[derive(Debug, Error)]
pub enum DeskwireError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel gateway errors (connection failure, rejected send, malformed payload).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The external channel is not authenticated/ready; outbound sends fail fast.
    #[error("channel not ready")]
    ChannelNotReady,

    /// Lookup on an unknown identifier where the caller requires presence.
    #[error("not found: {0}")]
    NotFound(String),

    /// Persisted data failed to parse or violated an invariant (fails closed, logged).
    #[error("data integrity error: {0}")]
    Integrity(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeskwireError {
    /// True for failures a client should see as a transient channel condition
    /// rather than a server fault.
    pub fn is_channel_failure(&self) -> bool {
        matches!(
            self,
            DeskwireError::Channel { .. }
                | DeskwireError::ChannelNotReady
                | DeskwireError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_not_ready_is_channel_failure() {
        assert!(DeskwireError::ChannelNotReady.is_channel_failure());
        assert!(
            DeskwireError::Timeout {
                duration: std::time::Duration::from_secs(5)
            }
            .is_channel_failure()
        );
        assert!(!DeskwireError::Config("x".into()).is_channel_failure());
    }

    #[test]
    fn error_display_messages() {
        let e = DeskwireError::NotFound("ticket 5511".into());
        assert_eq!(e.to_string(), "not found: ticket 5511");

        let e = DeskwireError::ChannelNotReady;
        assert_eq!(e.to_string(), "channel not ready");
    }
}
