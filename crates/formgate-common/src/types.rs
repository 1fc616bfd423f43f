//! Core types shared across Formgate components.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::DEFAULT_MIN_SCORE;

/// Minimum score a token must reach (0.0-1.0)
///
/// reCAPTCHA v3 scores run from 0.0 (very likely a bot) to 1.0 (very likely
/// a good interaction).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinScore(f64);

impl MinScore {
    pub const MIN: MinScore = MinScore(0.0);
    pub const MAX: MinScore = MinScore(1.0);
    pub const DEFAULT: MinScore = MinScore(DEFAULT_MIN_SCORE);

    /// Create a new MinScore, clamping to valid range [0, 1]
    pub fn new(score: f64) -> Self {
        if score.is_nan() {
            return Self::DEFAULT;
        }
        Self(score.clamp(0.0, 1.0))
    }

    /// Create a MinScore only if the value already lies in [0, 1]
    pub fn try_new(score: f64) -> Option<Self> {
        (0.0..=1.0).contains(&score).then_some(Self(score))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Returns true if `score` meets this threshold
    pub fn admits(&self, score: f64) -> bool {
        score >= self.0
    }
}

impl Default for MinScore {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-form verification policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormPolicy {
    /// Form identifier the policy applies to
    pub form_id: String,

    /// Action the token must have been issued for
    pub action: String,

    /// Minimum acceptable score
    pub min_score: MinScore,
}

impl FormPolicy {
    /// Build a policy, filling unset values with the defaults:
    /// the action falls back to the form ID and the score to 0.5.
    pub fn resolve(form_id: &str, action: Option<&str>, min_score: Option<MinScore>) -> Self {
        let action = action
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(form_id);

        Self {
            form_id: form_id.to_string(),
            action: action.to_string(),
            min_score: min_score.unwrap_or_default(),
        }
    }

    /// Policy for a form nobody configured
    pub fn fallback(form_id: &str) -> Self {
        Self::resolve(form_id, None, None)
    }
}

/// Outcome of one siteverify call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the token was valid for this site
    pub success: bool,

    /// Action the token was issued for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Interaction score (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Hostname of the site where the token was solved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Challenge load timestamp as reported by the remote (ISO 8601)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_ts: Option<String>,

    /// Error codes reported by the remote
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_codes: Vec<String>,

    /// Address of the client that submitted the form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<IpAddr>,

    /// When the response was received
    pub checked_at: DateTime<Utc>,

    /// Remote payload, verbatim
    pub raw: Map<String, Value>,
}

impl VerificationResult {
    /// Interpret a remote JSON object.
    ///
    /// Fields with an unexpected type read as absent; `success` must be a
    /// JSON `true` to count.
    pub fn from_payload(raw: Map<String, Value>, checked_at: DateTime<Utc>) -> Self {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

        let error_codes = raw
            .get("error-codes")
            .and_then(Value::as_array)
            .map(|codes| {
                codes
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            success: raw.get("success").and_then(Value::as_bool).unwrap_or(false),
            action: text("action"),
            score: raw.get("score").and_then(Value::as_f64),
            hostname: text("hostname"),
            challenge_ts: text("challenge_ts"),
            error_codes,
            remote_ip: None,
            checked_at,
            raw,
        }
    }

    /// Annotate the result with the submitting client's address
    pub fn with_remote_ip(mut self, remote_ip: Option<IpAddr>) -> Self {
        self.remote_ip = remote_ip;
        self
    }
}

/// Decision counters for monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Submissions accepted
    pub accepted: u64,

    /// Rejected: token was empty
    pub rejected_empty: u64,

    /// Rejected: token already consumed
    pub rejected_replay: u64,

    /// Rejected: expiring store unavailable
    pub rejected_store: u64,

    /// Rejected: siteverify unreachable or timed out
    pub rejected_transport: u64,

    /// Rejected: siteverify payload was not a JSON object
    pub rejected_malformed: u64,

    /// Rejected: valid response that failed the form's policy
    pub rejected_policy: u64,
}
