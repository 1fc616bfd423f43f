//! The verification gate.
//!
//! A submission passes when its token has not been seen before, the remote
//! scoring API vouches for it, and the result matches the form's policy.
//! Every failure along the way is a rejection.

mod client;
mod evaluator;
mod policy;
mod replay;
mod stats;

pub use client::{SiteVerifyClient, SiteVerifyConfig, Verifier};
pub use evaluator::{Decision, PolicyEvaluator, RejectReason, RequestScope, judge};
pub use policy::{ConfiguredPolicies, PolicyStore};
pub use replay::{ReplayGuard, token_digest, token_fingerprint};
