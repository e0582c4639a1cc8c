//! Per-account configuration loading and validation.
//!
//! One file per account under the config directory: `<account>.json`, or
//! `<account>.toml` when no JSON file exists.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use costbook::{FeeSchedule, PlanOptions, ZeroTargetPolicy};
use costbook_broker::Credentials;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::dates::parse_reference_date;
use crate::error::{Error, Result};

/// Config directory used when `--config-dir` is not given.
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Account configuration.
///
/// Secrets are wiped on drop and redacted by `Debug`.
#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Zeroizing<String>,
    #[serde(default)]
    pub totp_secret_key: Option<Zeroizing<String>>,
    #[serde(default)]
    pub int_account: Option<i64>,
    #[serde(default)]
    pub reference_date_from: String,
    #[serde(default)]
    pub reference_date_to: Option<String>,
    #[serde(default = "default_transaction_cost")]
    pub transaction_cost: f64,
    #[serde(default)]
    pub zero_target_policy: ZeroTargetPolicy,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_transaction_cost() -> f64 {
    FeeSchedule::DEFAULT_PER_TRADE
}

fn default_timeout() -> u64 {
    30
}

/// Command-line values that take precedence over the file.
#[derive(Clone, Copy, Debug, Default)]
pub struct Overrides {
    pub transaction_cost: Option<f64>,
    pub skip_zero_target: bool,
}

impl Config {
    /// Load and validate the configuration of `account` from `dir`.
    pub fn for_account(dir: &Path, account: &str, today: NaiveDate) -> Result<Self> {
        let json = dir.join(format!("{account}.json"));
        let toml = dir.join(format!("{account}.toml"));
        let config = if json.is_file() {
            Self::read_json(&json)?
        } else if toml.is_file() {
            Self::read_toml(&toml)?
        } else {
            return Err(Error::ConfigNotFound {
                account: account.to_string(),
                dir: dir.to_path_buf(),
            });
        };
        config.validate(today)?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn read_json(path: &Path) -> Result<Self> {
        let contents = Self::read(path)?;
        serde_json::from_str(&contents).map_err(|e| Error::ConfigJson {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn read_toml(path: &Path) -> Result<Self> {
        let contents = Self::read(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Apply command-line overrides and re-check the result.
    pub fn with_overrides(mut self, overrides: &Overrides, today: NaiveDate) -> Result<Self> {
        if let Some(cost) = overrides.transaction_cost {
            self.transaction_cost = cost;
        }
        if overrides.skip_zero_target {
            self.zero_target_policy = ZeroTargetPolicy::Skip;
        }
        self.validate(today)?;
        Ok(self)
    }

    /// Validate config invariants.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        self.check_credentials()?;
        if !self.transaction_cost.is_finite() || self.transaction_cost < 0.0 {
            return Err(Error::Config(
                "transaction_cost must be a finite amount >= 0".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be > 0".into()));
        }
        self.date_range(today)?;
        Ok(())
    }

    fn check_credentials(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Config("missing username".into()));
        }
        if self.password.is_empty() {
            return Err(Error::Config("missing password".into()));
        }
        Ok(())
    }

    /// Inclusive transaction window. The end defaults to `today`.
    pub fn date_range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        if self.reference_date_from.trim().is_empty() {
            return Err(Error::Config("missing reference_date_from".into()));
        }
        let from = parse_reference_date(&self.reference_date_from, today)?;
        let to = match &self.reference_date_to {
            Some(s) => parse_reference_date(s, today)?,
            None => today,
        };
        if from > to {
            return Err(Error::Config(format!(
                "reference_date_from ({from}) is after reference_date_to ({to})"
            )));
        }
        Ok((from, to))
    }

    /// Login credentials for the broker.
    pub fn credentials(&self) -> Result<Credentials> {
        self.check_credentials()?;
        let mut credentials = Credentials::new(&self.username, &self.password);
        if let Some(secret) = self.totp_secret_key.as_ref().filter(|s| !s.trim().is_empty()) {
            credentials = credentials.with_totp_secret(secret);
        }
        if let Some(account) = self.int_account {
            credentials = credentials.with_int_account(account);
        }
        Ok(credentials)
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions::default()
            .with_fees(FeeSchedule::flat(self.transaction_cost))
            .with_zero_target(self.zero_target_policy)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field(
                "totp_secret_key",
                &self.totp_secret_key.as_ref().map(|_| "<redacted>"),
            )
            .field("int_account", &self.int_account)
            .field("reference_date_from", &self.reference_date_from)
            .field("reference_date_to", &self.reference_date_to)
            .field("transaction_cost", &self.transaction_cost)
            .field("zero_target_policy", &self.zero_target_policy)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
