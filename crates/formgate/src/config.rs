//! Configuration management for Formgate.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;

use formgate_common::constants::store_keys::REPLAY_PREFIX;
use formgate_common::constants::{
    DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL, REPLAY_TTL_SECS, SITEVERIFY_URL,
    VERIFY_CONNECT_TIMEOUT_SECS, VERIFY_TIMEOUT_SECS, headers,
};

use crate::gate::SiteVerifyConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Where replay markers are kept
    #[serde(default)]
    pub store: StoreBackend,

    /// Trusted header carrying the client address; empty means use the peer address
    #[serde(default = "default_client_ip_header")]
    pub client_ip_header: String,

    /// reCAPTCHA configuration
    #[serde(default)]
    pub recaptcha: RecaptchaConfig,

    /// Replay protection configuration
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Per-form policies, keyed by form ID
    #[serde(default)]
    pub forms: HashMap<String, FormSettings>,
}

/// Values given on the command line; they win over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub redis_url: Option<String>,
    pub listen_addr: Option<String>,
}

/// Replay marker backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Process-local; markers do not survive restarts or span nodes
    Memory,
}

/// reCAPTCHA-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RecaptchaConfig {
    /// Public site key handed to the widget
    #[serde(default)]
    pub site_key: String,

    /// Secret key for siteverify (required)
    #[serde(default)]
    pub secret_key: String,

    /// siteverify endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Hide the floating badge (branding text must then be shown)
    #[serde(default)]
    pub hide_badge: bool,

    /// Show the branding text under protected forms
    #[serde(default)]
    pub add_text: bool,
}

impl Default for RecaptchaConfig {
    fn default() -> Self {
        Self {
            site_key: String::new(),
            secret_key: String::new(),
            endpoint: default_endpoint(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            hide_badge: false,
            add_text: false,
        }
    }
}

impl RecaptchaConfig {
    pub fn site_verify_config(&self) -> SiteVerifyConfig {
        SiteVerifyConfig {
            endpoint: self.endpoint.clone(),
            secret_key: self.secret_key.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Replay protection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    /// Marker lifetime in seconds
    #[serde(default = "default_replay_ttl")]
    pub ttl_secs: u64,

    /// Namespace for marker keys
    #[serde(default = "default_replay_prefix")]
    pub key_prefix: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_replay_ttl(),
            key_prefix: default_replay_prefix(),
        }
    }
}

/// One `[forms.<form_id>]` entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormSettings {
    /// Expected action; blank means the form ID
    #[serde(default)]
    pub action: Option<String>,

    /// Minimum score; unset or 0 means 0.5
    #[serde(default)]
    pub score: Option<f64>,
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_client_ip_header() -> String { headers::X_FORWARDED_FOR.to_string() }
fn default_endpoint() -> String { SITEVERIFY_URL.to_string() }
fn default_connect_timeout() -> u64 { VERIFY_CONNECT_TIMEOUT_SECS }
fn default_timeout() -> u64 { VERIFY_TIMEOUT_SECS }
fn default_replay_ttl() -> u64 { REPLAY_TTL_SECS } // 24 hours
fn default_replay_prefix() -> String { REPLAY_PREFIX.to_string() }

impl AppConfig {
    /// Load configuration from file and `FORMGATE__*` environment, with CLI overrides
    pub fn load(config_path: &str, overrides: &ConfigOverrides) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        builder = builder.add_source(Environment::with_prefix("FORMGATE").separator("__"));

        let mut config = Self::from_builder(builder)?;

        // Apply CLI overrides
        if let Some(ref redis_url) = overrides.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = overrides.listen_addr {
            config.listen_addr = listen.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to load config")?
            .try_deserialize()
            .context("Failed to parse config")
    }

    /// Reject settings the gate cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.recaptcha.secret_key.trim().is_empty() {
            bail!("recaptcha.secret_key is required (set it in the config file or FORMGATE__RECAPTCHA__SECRET_KEY)");
        }
        if self.recaptcha.timeout_secs == 0 || self.recaptcha.connect_timeout_secs == 0 {
            bail!("recaptcha timeouts must be at least one second");
        }
        if self.replay.ttl_secs == 0 {
            bail!("replay.ttl_secs must be positive");
        }
        Ok(())
    }

    /// Header to read the client address from, if any
    pub fn client_ip_header(&self) -> Option<&str> {
        let header = self.client_ip_header.trim();
        (!header.is_empty()).then_some(header)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            store: StoreBackend::default(),
            client_ip_header: default_client_ip_header(),
            recaptcha: RecaptchaConfig::default(),
            replay: ReplayConfig::default(),
            forms: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Result<AppConfig> {
        AppConfig::from_builder(
            config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn test_defaults() {
        let config = parse("").unwrap();

        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.store, StoreBackend::Redis);
        assert_eq!(config.recaptcha.endpoint, SITEVERIFY_URL);
        assert_eq!(config.recaptcha.connect_timeout_secs, 3);
        assert_eq!(config.recaptcha.timeout_secs, 15);
        assert_eq!(config.replay.ttl_secs, 86_400);
        assert_eq!(config.client_ip_header(), Some("X-Forwarded-For"));
        assert!(config.forms.is_empty());
        // No secret key yet
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            r#"
            store = "memory"
            client_ip_header = ""

            [recaptcha]
            site_key = "site"
            secret_key = "secret"
            timeout_secs = 5
            hide_badge = true

            [forms.user_login_form]
            action = "login"
            score = 0.7

            [forms.contact_message_form]
            action = ""
            "#,
        )
        .unwrap();

        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.client_ip_header(), None);
        assert!(config.recaptcha.hide_badge);
        assert!(config.validate().is_ok());

        let verify = config.recaptcha.site_verify_config();
        assert_eq!(verify.timeout, Duration::from_secs(5));
        assert_eq!(verify.secret_key, "secret");

        let login = &config.forms["user_login_form"];
        assert_eq!(login.action.as_deref(), Some("login"));
        assert_eq!(login.score, Some(0.7));

        let contact = &config.forms["contact_message_form"];
        assert_eq!(contact.action.as_deref(), Some(""));
        assert!(contact.score.is_none());
    }
}
