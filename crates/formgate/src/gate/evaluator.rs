//! Accept/reject decisions for form submissions.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use formgate_common::{FormPolicy, GateError, MetricsSnapshot, MinScore, VerificationResult};

use super::client::Verifier;
use super::policy::PolicyStore;
use super::replay::{ReplayGuard, token_fingerprint};
use super::stats::GateStats;

/// Why a submission was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No token was submitted
    EmptyToken,
    /// Token was already consumed
    Replayed,
    /// Replay store could not be reached
    StoreUnavailable,
    /// siteverify unreachable, timed out, or answered non-2xx
    Transport,
    /// siteverify payload was not a JSON object
    MalformedResponse,
    /// Remote said the token is invalid
    Unsuccessful,
    /// Token was issued for a different action
    ActionMismatch,
    /// Score missing or below the form's threshold
    ScoreTooLow,
}

/// Outcome of one verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Rejected(RejectReason),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Compare a remote result against the expected action and threshold
pub fn judge(result: &VerificationResult, action: &str, min_score: MinScore) -> Decision {
    if !result.success {
        return Decision::Rejected(RejectReason::Unsuccessful);
    }
    if result.action.as_deref() != Some(action) {
        return Decision::Rejected(RejectReason::ActionMismatch);
    }
    match result.score {
        Some(score) if min_score.admits(score) => Decision::Accepted,
        _ => Decision::Rejected(RejectReason::ScoreTooLow),
    }
}

/// Resolves form policy and runs replay check plus remote verification.
///
/// Shared across requests; per-request state lives in [`RequestScope`].
pub struct PolicyEvaluator {
    policies: Arc<dyn PolicyStore>,
    replay: ReplayGuard,
    verifier: Arc<dyn Verifier>,
    stats: GateStats,
}

impl PolicyEvaluator {
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        replay: ReplayGuard,
        verifier: Arc<dyn Verifier>,
    ) -> Self {
        Self {
            policies,
            replay,
            verifier,
            stats: GateStats::default(),
        }
    }

    /// Open a scope for one incoming request from `remote_ip`
    pub fn scope(&self, remote_ip: Option<IpAddr>) -> RequestScope<'_> {
        RequestScope {
            evaluator: self,
            remote_ip,
            results: HashMap::new(),
        }
    }

    /// Effective policy for a form
    pub fn policy_for(&self, form_id: &str) -> FormPolicy {
        self.policies.policy_for(form_id)
    }

    pub fn stats(&self) -> MetricsSnapshot {
        self.stats.snapshot()
    }

    async fn evaluate(
        &self,
        token: &str,
        action: &str,
        min_score: MinScore,
        remote_ip: Option<IpAddr>,
    ) -> (Decision, Option<VerificationResult>) {
        let (decision, result) = self.run(token, action, min_score, remote_ip).await;
        self.stats.record(&decision);
        (decision, result)
    }

    async fn run(
        &self,
        token: &str,
        action: &str,
        min_score: MinScore,
        remote_ip: Option<IpAddr>,
    ) -> (Decision, Option<VerificationResult>) {
        if token.is_empty() {
            return (Decision::Rejected(RejectReason::EmptyToken), None);
        }

        match self.replay.consume(token).await {
            Ok(true) => {}
            Ok(false) => return (Decision::Rejected(RejectReason::Replayed), None),
            Err(e) => {
                tracing::error!(
                    token = %token_fingerprint(token),
                    store = self.replay.store().name(),
                    error = %e,
                    "Replay store unavailable, rejecting submission"
                );
                return (Decision::Rejected(RejectReason::StoreUnavailable), None);
            }
        }

        let result = match self.verifier.verify(token, remote_ip).await {
            Ok(result) => result.with_remote_ip(remote_ip),
            Err(GateError::MalformedResponse(_)) => {
                return (Decision::Rejected(RejectReason::MalformedResponse), None);
            }
            Err(_) => return (Decision::Rejected(RejectReason::Transport), None),
        };

        let decision = judge(&result, action, min_score);

        if let Decision::Rejected(reason) = decision {
            tracing::debug!(
                token = %token_fingerprint(token),
                expected_action = %action,
                min_score = min_score.value(),
                action = ?result.action,
                score = ?result.score,
                reason = ?reason,
                "Submission rejected by policy"
            );
        }

        (decision, Some(result))
    }
}

/// Per-request view of the evaluator.
///
/// Keeps every result obtained during the request so the caller can inspect
/// it after the decision.
pub struct RequestScope<'a> {
    evaluator: &'a PolicyEvaluator,
    remote_ip: Option<IpAddr>,
    results: HashMap<String, VerificationResult>,
}

impl RequestScope<'_> {
    /// Verify a token against the policy configured for `form_id`
    pub async fn verify_for_form(&mut self, token: &str, form_id: &str) -> bool {
        self.evaluate_for_form(token, form_id).await.is_accepted()
    }

    /// Verify a token against an explicit action and threshold
    pub async fn verify_against_policy(
        &mut self,
        token: &str,
        action: &str,
        min_score: MinScore,
    ) -> bool {
        self.evaluate_against_policy(token, action, min_score)
            .await
            .is_accepted()
    }

    pub async fn evaluate_for_form(&mut self, token: &str, form_id: &str) -> Decision {
        let policy = self.evaluator.policy_for(form_id);
        self.evaluate_against_policy(token, &policy.action, policy.min_score)
            .await
    }

    pub async fn evaluate_against_policy(
        &mut self,
        token: &str,
        action: &str,
        min_score: MinScore,
    ) -> Decision {
        let (decision, result) = self
            .evaluator
            .evaluate(token, action, min_score, self.remote_ip)
            .await;

        if let Some(result) = result {
            self.results.insert(token.to_string(), result);
        }

        decision
    }

    /// Result of the most recent remote verification of `token` in this scope
    pub fn last_result(&self, token: &str) -> Option<&VerificationResult> {
        self.results.get(token)
    }
}
