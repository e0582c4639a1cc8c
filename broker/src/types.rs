//! Shared broker types: credentials and account details.

use std::fmt;

use zeroize::Zeroizing;

/// Login credentials.
///
/// Secrets are wiped from memory on drop and never shown by `Debug`.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Zeroizing<String>,
    /// Base32 TOTP secret, when two-factor authentication is enabled.
    pub totp_secret_key: Option<Zeroizing<String>>,
    /// Code typed in by the user, used instead of a generated one.
    pub one_time_password: Option<Zeroizing<String>>,
    pub int_account: Option<i64>,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
            totp_secret_key: None,
            one_time_password: None,
            int_account: None,
        }
    }

    pub fn with_totp_secret(mut self, secret: &str) -> Self {
        self.totp_secret_key = Some(Zeroizing::new(secret.to_string()));
        self
    }

    pub fn with_one_time_password(mut self, code: &str) -> Self {
        self.one_time_password = Some(Zeroizing::new(code.to_string()));
        self
    }

    pub fn with_int_account(mut self, int_account: i64) -> Self {
        self.int_account = Some(int_account);
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field(
                "totp_secret_key",
                &self.totp_secret_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "one_time_password",
                &self.one_time_password.as_ref().map(|_| "<redacted>"),
            )
            .field("int_account", &self.int_account)
            .finish()
    }
}

/// Account details returned after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDetails {
    pub int_account: i64,
    pub username: Option<String>,
}
