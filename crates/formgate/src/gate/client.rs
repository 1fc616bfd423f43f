//! Outbound siteverify call.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use formgate_common::constants::{
    SITEVERIFY_URL, VERIFY_CONNECT_TIMEOUT_SECS, VERIFY_TIMEOUT_SECS,
};
use formgate_common::{GateError, VerificationResult};
use reqwest::header::ACCEPT;
use serde_json::Value;

use super::replay::token_fingerprint;

/// Something that can score a token with the remote API
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Ask the remote whether `token` is genuine.
    ///
    /// Transport failures come back as `Transport`/`Timeout`, a payload that
    /// is not a JSON object as `MalformedResponse`.
    async fn verify(
        &self,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<VerificationResult, GateError>;
}

/// Settings for [`SiteVerifyClient`]
#[derive(Debug, Clone)]
pub struct SiteVerifyConfig {
    /// Verification endpoint
    pub endpoint: String,
    /// Pre-shared secret key
    pub secret_key: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl SiteVerifyConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            endpoint: SITEVERIFY_URL.to_string(),
            secret_key: secret_key.into(),
            connect_timeout: Duration::from_secs(VERIFY_CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs(VERIFY_TIMEOUT_SECS),
        }
    }
}

/// reCAPTCHA siteverify client
pub struct SiteVerifyClient {
    /// HTTP client (reusable connection pool)
    http: reqwest::Client,
    endpoint: String,
    secret_key: String,
}

impl SiteVerifyClient {
    pub fn new(config: SiteVerifyConfig) -> Result<Self, GateError> {
        if config.secret_key.trim().is_empty() {
            return Err(GateError::Config("secret key is not set".to_string()));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(concat!("formgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GateError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
            secret_key: config.secret_key,
        })
    }

    async fn request(
        &self,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<VerificationResult, GateError> {
        let remote_ip = remote_ip.map(|ip| ip.to_string());

        let mut params = vec![("secret", self.secret_key.as_str()), ("response", token)];
        if let Some(ip) = remote_ip.as_deref() {
            params.push(("remoteip", ip));
        }

        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json; charset=UTF-8")
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;

        let body = response.bytes().await.map_err(transport_error)?;

        let payload: Value = serde_json::from_slice(&body)
            .map_err(|e| GateError::MalformedResponse(format!("invalid JSON: {e}")))?;

        match payload {
            Value::Object(raw) => Ok(VerificationResult::from_payload(raw, chrono::Utc::now())),
            other => Err(GateError::MalformedResponse(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

#[async_trait]
impl Verifier for SiteVerifyClient {
    async fn verify(
        &self,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<VerificationResult, GateError> {
        let outcome = self.request(token, remote_ip).await;

        match &outcome {
            Err(e) if e.is_operator_visible() => {
                tracing::error!(
                    token = %token_fingerprint(token),
                    endpoint = %self.endpoint,
                    error = %e,
                    "siteverify request failed"
                );
            }
            Err(e) => {
                tracing::debug!(
                    token = %token_fingerprint(token),
                    error = %e,
                    "siteverify returned no usable result"
                );
            }
            Ok(_) => {}
        }

        outcome
    }
}

fn transport_error(err: reqwest::Error) -> GateError {
    if err.is_timeout() {
        GateError::Timeout(err.to_string())
    } else {
        GateError::Transport(err.to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
