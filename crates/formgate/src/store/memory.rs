//! In-process expiring store for single-node deployments and tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use formgate_common::GateError;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::ExpiringStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// HashMap-backed store; expired entries are dropped lazily on write
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }
}

#[async_trait]
impl ExpiringStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, GateError> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), GateError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn add_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, GateError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.is_live(now));

        if entries.contains_key(key) {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        assert_ok!(store.set_ex("a", "1", Duration::from_secs(60)).await);

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").await.unwrap(), None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_add_if_absent_once() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);

        assert!(store.add_if_absent("k", "1", ttl).await.unwrap());
        assert!(!store.add_if_absent("k", "2", ttl).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = MemoryStore::new();
        let ttl = Duration::from_millis(20);

        assert!(store.add_if_absent("k", "1", ttl).await.unwrap());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.add_if_absent("k", "1", ttl).await.unwrap());
    }
}
