// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::DeskConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &DeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if let Some(ref url) = config.whatsapp.bridge_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ConfigError::Validation {
                message: format!("whatsapp.bridge_url `{url}` must be an http(s) URL"),
            });
        }
    }

    if config.whatsapp.send_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "whatsapp.send_timeout_ms must be greater than zero".to_string(),
        });
    }

    if let Some(ref secret) = config.auth.token_secret {
        if secret.len() < 16 {
            errors.push(ConfigError::Validation {
                message: format!(
                    "auth.token_secret must be at least 16 bytes, got {}",
                    secret.len()
                ),
            });
        }
    }

    if config.auth.token_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "auth.token_ttl_secs must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = DeskConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_host_is_rejected() {
        let mut config = DeskConfig::default();
        config.server.host = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("server.host")));
    }

    #[test]
    fn non_http_bridge_url_is_rejected() {
        let mut config = DeskConfig::default();
        config.whatsapp.bridge_url = Some("ftp://bridge".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn short_token_secret_is_rejected() {
        let mut config = DeskConfig::default();
        config.auth.token_secret = Some("short".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("token_secret"))
        );
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = DeskConfig::default();
        config.server.host = String::new();
        config.storage.database_path = String::new();
        config.whatsapp.send_timeout_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
