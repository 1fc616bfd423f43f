//! Shared constants for Formgate components.

/// reCAPTCHA v3 siteverify endpoint
pub const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Formgate HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8890";

/// Minimum score applied when a form has no configured score
pub const DEFAULT_MIN_SCORE: f64 = 0.5;

/// Replay marker lifetime (24 hours)
pub const REPLAY_TTL_SECS: u64 = 86_400;

/// Connect timeout for the siteverify call
pub const VERIFY_CONNECT_TIMEOUT_SECS: u64 = 3;

/// Overall timeout for the siteverify call
pub const VERIFY_TIMEOUT_SECS: u64 = 15;

/// Visible branding required when the badge is hidden.
///
/// See <https://developers.google.com/recaptcha/docs/faq#id-like-to-hide-the-recaptcha-badge.-what-is-allowed>
pub const RECAPTCHA_BRANDING: &str = "This site is protected by reCAPTCHA and the Google \
    <a href=\"https://policies.google.com/privacy\">Privacy Policy</a> and \
    <a href=\"https://policies.google.com/terms\">Terms of Service</a> apply.";

/// Store key prefixes
pub mod store_keys {
    /// Replay marker: formgate:replay:{sha256(token)}
    pub const REPLAY_PREFIX: &str = "formgate:replay:";
}

/// HTTP header names
pub mod headers {
    /// Client address as forwarded by the reverse proxy
    pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";
}
