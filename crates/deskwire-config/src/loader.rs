// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./deskwire.toml` > `~/.config/deskwire/deskwire.toml`
//! > `/etc/deskwire/deskwire.toml` with environment variable overrides via
//! the `DESKWIRE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DeskConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/deskwire/deskwire.toml` (system-wide)
/// 3. `~/.config/deskwire/deskwire.toml` (user XDG config)
/// 4. `./deskwire.toml` (local directory)
/// 5. `DESKWIRE_*` environment variables
pub fn load_config() -> Result<DeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<DeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DeskConfig::default()))
        .merge(Toml::file("/etc/deskwire/deskwire.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("deskwire/deskwire.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("deskwire.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `DESKWIRE_SERVER_BEARER_TOKEN` must map
/// to `server.bearer_token`, not `server.bearer.token`.
fn env_provider() -> Env {
    Env::prefixed("DESKWIRE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("server_", "server.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("auth_", "auth.", 1);
        mapped.into()
    })
}
