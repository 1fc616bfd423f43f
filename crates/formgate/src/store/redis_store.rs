//! Redis-backed expiring store.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use formgate_common::GateError;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::ExpiringStore;

/// Expiring store on top of a Redis connection manager (auto-reconnecting)
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self { conn })
    }
}

/// Redis expiries are whole seconds; never round a TTL down to "no expiry".
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn store_error(err: redis::RedisError) -> GateError {
    GateError::Store(err.to_string())
}

#[async_trait]
impl ExpiringStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, GateError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(store_error)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), GateError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl))
            .await
            .map_err(store_error)
    }

    async fn add_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, GateError> {
        let mut conn = self.conn.clone();

        // SET NX replies OK when written and nil when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;

        Ok(reply.is_some())
    }

    async fn ping(&self) -> Result<(), GateError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
