//! Token verification endpoints (called by form-submission handlers).

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts, State},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};

use formgate_common::{MinScore, VerificationResult};

use crate::gate::{Decision, RequestScope};
use crate::state::AppState;

/// Address of the client that submitted the form.
///
/// Read from the configured trusted header (first entry), otherwise the TCP
/// peer address.
pub struct ClientIp(pub Option<IpAddr>);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let forwarded = state
            .config
            .client_ip_header()
            .and_then(|name| parts.headers.get(name))
            .and_then(|value| value.to_str().ok())
            .and_then(first_address);

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self(forwarded.or(peer)))
    }
}

/// First address of a comma-separated forwarding chain
fn first_address(value: &str) -> Option<IpAddr> {
    value.split(',').next()?.trim().parse().ok()
}

#[derive(Deserialize)]
pub struct VerifyFormRequest {
    /// Token from the widget's hidden form field
    #[serde(default)]
    token: String,
    form_id: String,
}

#[derive(Deserialize)]
pub struct VerifyActionRequest {
    #[serde(default)]
    token: String,
    action: String,
    /// Defaults to 0.5; clamped to [0, 1]
    min_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    accepted: bool,
    /// Remote result for the token, when the remote was reached
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<VerificationResult>,
}

impl VerifyResponse {
    fn new(decision: Decision, scope: &RequestScope<'_>, token: &str) -> Self {
        Self {
            accepted: decision.is_accepted(),
            result: scope.last_result(token).cloned(),
        }
    }
}

/// Verify a token against the policy configured for a form
pub async fn verify_form(
    State(state): State<AppState>,
    ClientIp(remote_ip): ClientIp,
    Json(payload): Json<VerifyFormRequest>,
) -> Json<VerifyResponse> {
    let mut scope = state.evaluator.scope(remote_ip);
    let decision = scope
        .evaluate_for_form(&payload.token, &payload.form_id)
        .await;

    tracing::info!(
        form_id = %payload.form_id,
        remote_ip = ?remote_ip,
        accepted = decision.is_accepted(),
        "Form submission verified"
    );

    Json(VerifyResponse::new(decision, &scope, &payload.token))
}

/// Verify a token against an explicit action and minimum score
pub async fn verify_action(
    State(state): State<AppState>,
    ClientIp(remote_ip): ClientIp,
    Json(payload): Json<VerifyActionRequest>,
) -> Json<VerifyResponse> {
    let min_score = payload.min_score.map(MinScore::new).unwrap_or_default();

    let mut scope = state.evaluator.scope(remote_ip);
    let decision = scope
        .evaluate_against_policy(&payload.token, &payload.action, min_score)
        .await;

    tracing::info!(
        action = %payload.action,
        min_score = min_score.value(),
        remote_ip = ?remote_ip,
        accepted = decision.is_accepted(),
        "Action token verified"
    );

    Json(VerifyResponse::new(decision, &scope, &payload.token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_address() {
        assert_eq!(
            first_address("203.0.113.5, 10.0.0.1"),
            Some("203.0.113.5".parse().unwrap())
        );
        assert_eq!(first_address("2001:db8::1"), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(first_address("unknown"), None);
        assert_eq!(first_address(""), None);
    }
}
