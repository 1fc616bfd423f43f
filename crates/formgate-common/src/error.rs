//! Common error types for Formgate components.

use thiserror::Error;

/// Common errors across Formgate components
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Expiring store connection/operation error
    #[error("Store error: {0}")]
    Store(String),

    /// Outbound siteverify call failed (DNS, TLS, connect, non-2xx)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Outbound siteverify call timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Remote payload was not a JSON object
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl GateError {
    /// Returns true if an operator should see this error in the logs.
    ///
    /// A malformed payload is a "no result" outcome, not an outage.
    pub fn is_operator_visible(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Transport(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_errors_are_visible() {
        assert!(GateError::Store("down".into()).is_operator_visible());
        assert!(GateError::Timeout("15s".into()).is_operator_visible());
        assert!(!GateError::MalformedResponse("not json".into()).is_operator_visible());
        assert!(!GateError::InvalidInput("empty".into()).is_operator_visible());
        assert!(!GateError::Config("no secret".into()).is_operator_visible());
    }
}
