//! Expiring key-value stores.
//!
//! The replay guard only needs get / set-with-TTL, plus an add-if-absent
//! primitive that backends override when they can do it atomically.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use formgate_common::GateError;

/// Key-value store whose entries expire
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    /// Backend name for logs and readiness output
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, GateError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), GateError>;

    /// Write `value` only if `key` holds nothing. Returns true if written.
    ///
    /// The default is a plain get followed by set; two callers racing on the
    /// same key can both see it absent.
    async fn add_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, GateError> {
        if self.get(key).await?.is_some() {
            return Ok(false);
        }
        self.set_ex(key, value, ttl).await?;
        Ok(true)
    }

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), GateError> {
        Ok(())
    }
}
