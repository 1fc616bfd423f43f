//! Application state and shared resources.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::config::{AppConfig, StoreBackend};
use crate::gate::{ConfiguredPolicies, PolicyEvaluator, ReplayGuard, SiteVerifyClient, Verifier};
use crate::store::{ExpiringStore, MemoryStore, RedisStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Replay marker store
    pub store: Arc<dyn ExpiringStore>,

    /// Verification gate
    pub evaluator: Arc<PolicyEvaluator>,

    /// Process start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state, connecting to the configured store
    pub async fn new(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn ExpiringStore> = match config.store {
            StoreBackend::Redis => {
                let store = RedisStore::connect(&config.redis_url).await?;
                tracing::info!(redis_url = %config.redis_url, "Redis connected");
                Arc::new(store)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory replay store (markers are lost on restart)");
                Arc::new(MemoryStore::new())
            }
        };

        let verifier = SiteVerifyClient::new(config.recaptcha.site_verify_config())
            .context("Failed to create siteverify client")?;

        Self::from_parts(config, store, Arc::new(verifier))
    }

    /// Assemble state from an already-built store and verifier
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn ExpiringStore>,
        verifier: Arc<dyn Verifier>,
    ) -> Result<Self> {
        let policies = ConfiguredPolicies::from_settings(&config.forms)
            .context("Invalid form policy configuration")?;
        tracing::info!(forms = policies.len(), "Form policies loaded");

        let replay = ReplayGuard::new(
            store.clone(),
            Duration::from_secs(config.replay.ttl_secs),
            config.replay.key_prefix.clone(),
        );
        let evaluator = Arc::new(PolicyEvaluator::new(Arc::new(policies), replay, verifier));

        Ok(Self {
            config: Arc::new(config),
            store,
            evaluator,
            started_at: Utc::now(),
        })
    }

    /// Seconds since start-up
    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}
