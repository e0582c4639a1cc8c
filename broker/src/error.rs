//! Broker error types.

/// Errors that can occur during broker operations.
///
/// Variants are tagged by cause so callers can pick a retry policy: only
/// [`BrokerError::Network`] is worth retrying as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("invalid credentials: {0}")]
    Credentials(String),

    #[error("one-time password required (two-factor authentication is enabled)")]
    TotpRequired,

    #[error("invalid TOTP secret key: {0}")]
    InvalidTotpSecret(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("not connected")]
    NotConnected,
}

impl BrokerError {
    /// True for transient failures where repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Network(_))
    }

    /// True when the user has to fix the credentials before trying again.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            BrokerError::Credentials(_) | BrokerError::TotpRequired | BrokerError::InvalidTotpSecret(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_is_retryable() {
        assert!(BrokerError::Network("timeout".into()).is_retryable());
        assert!(!BrokerError::Credentials("bad".into()).is_retryable());
        assert!(!BrokerError::UnexpectedResponse("shape".into()).is_retryable());
        assert!(!BrokerError::TotpRequired.is_retryable());
        assert!(!BrokerError::NotConnected.is_retryable());
    }

    #[test]
    fn auth_errors() {
        assert!(BrokerError::Credentials("bad".into()).is_auth());
        assert!(BrokerError::TotpRequired.is_auth());
        assert!(!BrokerError::Network("down".into()).is_auth());
    }

    #[test]
    fn display() {
        assert_eq!(
            BrokerError::Credentials("badCredentials".into()).to_string(),
            "invalid credentials: badCredentials"
        );
        assert_eq!(BrokerError::NotConnected.to_string(), "not connected");
    }
}
