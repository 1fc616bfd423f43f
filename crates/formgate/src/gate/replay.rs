//! Single-use enforcement for verification tokens.

use std::sync::Arc;
use std::time::Duration;

use formgate_common::GateError;
use sha2::{Digest, Sha256};

use crate::store::ExpiringStore;

/// Hex SHA-256 of a token; tokens never reach the store in clear
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Short digest prefix safe to put in logs
pub fn token_fingerprint(token: &str) -> String {
    let mut digest = token_digest(token);
    digest.truncate(8);
    digest
}

/// Marks tokens as consumed in an expiring store
pub struct ReplayGuard {
    store: Arc<dyn ExpiringStore>,
    /// Marker lifetime
    ttl: Duration,
    /// Namespace for marker keys
    key_prefix: String,
}

impl ReplayGuard {
    pub fn new(store: Arc<dyn ExpiringStore>, ttl: Duration, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            ttl,
            key_prefix: key_prefix.into(),
        }
    }

    /// Store key holding the marker for `token`
    pub fn key_for(&self, token: &str) -> String {
        format!("{}{}", self.key_prefix, token_digest(token))
    }

    /// Consume a token.
    ///
    /// Returns `Ok(true)` the first time a token is seen and `Ok(false)` on
    /// every later call within the marker TTL. Store failures are returned
    /// as errors, never as a pass.
    pub async fn consume(&self, token: &str) -> Result<bool, GateError> {
        if token.is_empty() {
            return Err(GateError::InvalidInput("empty token".to_string()));
        }

        let key = self.key_for(token);
        let consumed_at = chrono::Utc::now().timestamp().to_string();
        let first_use = self.store.add_if_absent(&key, &consumed_at, self.ttl).await?;

        if !first_use {
            tracing::debug!(
                token = %token_fingerprint(token),
                store = self.store.name(),
                "Token replay detected"
            );
        }

        Ok(first_use)
    }

    /// Backend the markers live in
    pub fn store(&self) -> &Arc<dyn ExpiringStore> {
        &self.store
    }
}
