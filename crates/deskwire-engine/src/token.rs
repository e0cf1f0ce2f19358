// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed capability tokens.
//!
//! A token is `base64url(claims_json) "." hex(hmac_sha256)`, signed over
//! the encoded claims with the configured secret. Clients present it on
//! privileged requests; verification is offline and stateless.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use deskwire_core::types::Permission;
use deskwire_core::DeskwireError;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried inside a capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub permissions: BTreeSet<Permission>,
    /// Unix seconds after which the token is rejected.
    pub exp: u64,
}

/// A signed, ready-to-transmit capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityToken {
    pub token: String,
    pub expires_at: u64,
}

/// Issues and verifies capability tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
    ttl_secs: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    fn mac(&self) -> Result<HmacSha256, DeskwireError> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| DeskwireError::Internal(format!("hmac key: {e}")))
    }

    /// Sign a fresh token for the given user and permission set.
    pub fn issue(
        &self,
        user_id: &str,
        permissions: &BTreeSet<Permission>,
    ) -> Result<CapabilityToken, DeskwireError> {
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            permissions: permissions.clone(),
            exp: unix_now() + self.ttl_secs,
        };
        let payload = serde_json::to_string(&claims)
            .map_err(|e| DeskwireError::Internal(format!("serialize claims: {e}")))?;
        let encoded = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(CapabilityToken {
            token: format!("{encoded}.{signature}"),
            expires_at: claims.exp,
        })
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, DeskwireError> {
        let (encoded, signature) = token
            .split_once('.')
            .ok_or_else(|| DeskwireError::Integrity("malformed token".into()))?;
        let signature = hex::decode(signature)
            .map_err(|_| DeskwireError::Integrity("malformed token signature".into()))?;

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| DeskwireError::Integrity("token signature mismatch".into()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| DeskwireError::Integrity("malformed token payload".into()))?;
        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|_| DeskwireError::Integrity("malformed token claims".into()))?;

        if claims.exp <= unix_now() {
            return Err(DeskwireError::Integrity("token expired".into()));
        }
        Ok(claims)
    }
}
