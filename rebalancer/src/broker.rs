//! Broker sessions used by the rebalancer pipeline.
//!
//! `Connector` builds a broker handle from credentials, `CodePrompt`
//! supplies a one-time password when the account asks for one. Both are
//! traits so the pipeline can run against `MockBroker` in tests.

use std::time::Duration;

use costbook_broker::degiro::DegiroBroker;
use costbook_broker::{Broker, BrokerError, Credentials};
use log::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Builds an unconnected broker handle.
pub trait Connector {
    fn broker(&mut self, credentials: &Credentials) -> Box<dyn Broker>;
}

impl<F> Connector for F
where
    F: FnMut(&Credentials) -> Box<dyn Broker>,
{
    fn broker(&mut self, credentials: &Credentials) -> Box<dyn Broker> {
        self(credentials)
    }
}

/// Connects to the DeGiro web API.
pub struct DegiroConnector {
    pub timeout: Duration,
}

impl Connector for DegiroConnector {
    fn broker(&mut self, credentials: &Credentials) -> Box<dyn Broker> {
        Box::new(DegiroBroker::new(credentials.clone()).with_timeout(self.timeout))
    }
}

/// Source of one-time passwords for two-factor login.
pub trait CodePrompt {
    /// `None` when no code can be obtained.
    fn one_time_password(&mut self) -> Result<Option<String>>;
}

/// Asks on the terminal.
pub struct TerminalPrompt;

impl CodePrompt for TerminalPrompt {
    fn one_time_password(&mut self) -> Result<Option<String>> {
        let code: String = dialoguer::Input::new()
            .with_prompt("One-time password")
            .interact_text()
            .map_err(|e| Error::Prompt(e.to_string()))?;
        let code = code.trim().to_string();
        Ok((!code.is_empty()).then_some(code))
    }
}

/// Never asks (`--no-input`).
pub struct NoPrompt;

impl CodePrompt for NoPrompt {
    fn one_time_password(&mut self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// A connected broker plus the credentials it was opened with.
pub struct Session {
    pub broker: Box<dyn Broker>,
    pub credentials: Credentials,
}

impl Session {
    /// Account number, once resolved.
    pub fn int_account(&self) -> Option<i64> {
        self.credentials.int_account
    }

    pub fn close(mut self) {
        if let Err(e) = self.broker.disconnect() {
            warn!("Disconnect failed: {e}");
        }
    }
}

/// Connect, asking for a one-time password if the account requires one
/// and no TOTP secret is configured.
pub fn connect(
    credentials: &Credentials,
    connector: &mut dyn Connector,
    prompt: &mut dyn CodePrompt,
) -> Result<Box<dyn Broker>> {
    let mut broker = connector.broker(credentials);
    match broker.connect() {
        Ok(()) => Ok(broker),
        Err(BrokerError::TotpRequired)
            if credentials.totp_secret_key.is_none()
                && credentials.one_time_password.is_none() =>
        {
            let Some(code) = prompt.one_time_password()? else {
                return Err(BrokerError::TotpRequired.into());
            };
            let with_code = credentials.clone().with_one_time_password(&code);
            let mut broker = connector.broker(&with_code);
            broker.connect()?;
            Ok(broker)
        }
        Err(e) => Err(e.into()),
    }
}

/// Check the configured credentials and open a session.
///
/// Username and password must be present. Without a configured account
/// number, the one the broker resolved while connecting is used, or else
/// it is fetched from the client details. It is printed and kept in the
/// session credentials.
pub fn validate_credentials(
    config: &Config,
    connector: &mut dyn Connector,
    prompt: &mut dyn CodePrompt,
) -> Result<Session> {
    let mut credentials = config.credentials()?;
    let broker = connect(&credentials, connector, prompt)?;

    if credentials.int_account.is_none() {
        let int_account = match broker.int_account() {
            Some(n) => n,
            None => broker.client_details()?.int_account,
        };
        println!("Your account number: {int_account}");
        credentials.int_account = Some(int_account);
    }
    info!("Connected as {}", credentials.username);

    Ok(Session {
        broker,
        credentials,
    })
}
