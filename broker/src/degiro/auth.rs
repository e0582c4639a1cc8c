//! Time-based one-time passwords for DeGiro two-factor login.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::BrokerError;

const DIGITS: usize = 6;
const STEP_SECS: u64 = 30;

/// Build a TOTP generator from a base32 secret (RFC 6238, SHA-1, 6 digits, 30 s).
fn generator(secret_key: &str) -> Result<TOTP, BrokerError> {
    let normalized: String = secret_key
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let bytes = Secret::Encoded(normalized)
        .to_bytes()
        .map_err(|e| BrokerError::InvalidTotpSecret(format!("{e:?}")))?;
    Ok(TOTP::new_unchecked(Algorithm::SHA1, DIGITS, 1, STEP_SECS, bytes))
}

/// One-time password for the given unix time.
pub fn code_at(secret_key: &str, unix_secs: u64) -> Result<String, BrokerError> {
    Ok(generator(secret_key)?.generate(unix_secs))
}

/// One-time password for now.
pub fn current_code(secret_key: &str) -> Result<String, BrokerError> {
    code_at(secret_key, current_timestamp_secs())
}

fn current_timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B secret ("12345678901234567890"), truncated to 6 digits.
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn rfc_vectors() {
        assert_eq!(code_at(RFC_SECRET, 59).unwrap(), "287082");
        assert_eq!(code_at(RFC_SECRET, 1_111_111_109).unwrap(), "081804");
    }

    #[test]
    fn same_window_same_code() {
        assert_eq!(code_at(RFC_SECRET, 60).unwrap(), code_at(RFC_SECRET, 89).unwrap());
    }

    #[test]
    fn tolerates_spacing_and_case() {
        let spaced = "gezd gnbv gy3t qojq gezd gnbv gy3t qojq";
        assert_eq!(code_at(spaced, 59).unwrap(), "287082");
    }

    #[test]
    fn rejects_invalid_base32() {
        let err = code_at("not base32 !!", 59).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidTotpSecret(_)));
    }

    #[test]
    fn current_code_has_six_digits() {
        let code = current_code(RFC_SECRET).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
