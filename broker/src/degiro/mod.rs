//! DeGiro broker implementation.

pub mod auth;
pub mod client;
pub mod types;

use std::time::Duration;

use chrono::NaiveDate;
use costbook::{PositionRecord, ProductCatalog, ProductId, Transaction};
use log::{debug, warn};
use zeroize::Zeroizing;

use crate::Broker;
use crate::error::BrokerError;
use crate::types::{ClientDetails, Credentials};
use client::{DEFAULT_BASE_URL, DegiroClient};

/// DeGiro broker implementing the generic Broker trait.
///
/// Blocking (sync) via reqwest::blocking. The account number is taken from
/// the credentials or looked up right after login.
pub struct DegiroBroker {
    credentials: Credentials,
    base_url: String,
    timeout: Duration,
    int_account: Option<i64>,
    client: Option<DegiroClient>,
}

impl DegiroBroker {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a new DeGiro broker handle (not yet connected).
    pub fn new(credentials: Credentials) -> Self {
        let int_account = credentials.int_account;
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            int_account,
            client: None,
        }
    }

    /// Per-request timeout (default 30 s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point at another host (default `https://trader.degiro.nl`).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn require_client(&self) -> Result<&DegiroClient, BrokerError> {
        self.client.as_ref().ok_or(BrokerError::NotConnected)
    }

    fn require_account(&self) -> Result<(&DegiroClient, i64), BrokerError> {
        let client = self.require_client()?;
        let account = self.int_account.ok_or(BrokerError::NotConnected)?;
        Ok((client, account))
    }

    /// Typed-in code first, then one generated from the secret key.
    fn one_time_password(&self) -> Result<Option<Zeroizing<String>>, BrokerError> {
        if let Some(code) = &self.credentials.one_time_password {
            return Ok(Some(code.clone()));
        }
        match &self.credentials.totp_secret_key {
            Some(secret) => auth::current_code(secret).map(|c| Some(Zeroizing::new(c))),
            None => Ok(None),
        }
    }
}

impl Broker for DegiroBroker {
    fn connect(&mut self) -> Result<(), BrokerError> {
        let otp = self.one_time_password()?;
        let client = DegiroClient::login(
            &self.base_url,
            &self.credentials,
            otp.as_deref().map(String::as_str),
            self.timeout,
        )?;
        if self.int_account.is_none() {
            let info = client.client_info()?;
            debug!("Resolved account number {}", info.int_account);
            self.int_account = Some(info.int_account);
        }
        self.client = Some(client);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), BrokerError> {
        self.client = None;
        Ok(())
    }

    fn int_account(&self) -> Option<i64> {
        self.int_account
    }

    fn client_details(&self) -> Result<ClientDetails, BrokerError> {
        let info = self.require_client()?.client_info()?;
        Ok(ClientDetails {
            int_account: info.int_account,
            username: info.username,
        })
    }

    fn transactions(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>, BrokerError> {
        let (client, account) = self.require_account()?;
        let entries = client.transactions(account, from, to)?;
        Ok(entries.iter().map(Transaction::from).collect())
    }

    fn products_info(&self, products: &[ProductId]) -> Result<ProductCatalog, BrokerError> {
        if products.is_empty() {
            return Ok(ProductCatalog::default());
        }
        let (client, account) = self.require_account()?;
        let ids: Vec<String> = products.iter().map(ProductId::to_string).collect();
        let data = client.products_info(account, &ids)?;

        let mut catalog = ProductCatalog::default();
        for (key, entry) in data {
            match key.parse::<ProductId>() {
                Ok(id) => {
                    catalog.insert(id, entry.into());
                }
                Err(_) => warn!("Ignoring product info under non-numeric key {key:?}"),
            }
        }
        Ok(catalog)
    }

    fn portfolio(&self) -> Result<Vec<PositionRecord>, BrokerError> {
        let (client, account) = self.require_account()?;
        let update = client.update(account)?;
        let section = update
            .portfolio
            .ok_or_else(|| BrokerError::UnexpectedResponse("no portfolio data".into()))?;
        section.value.iter().map(|row| row.to_record()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected_until_login() {
        let broker = DegiroBroker::new(Credentials::new("u", "p"));
        assert_eq!(broker.portfolio().unwrap_err(), BrokerError::NotConnected);
        assert_eq!(broker.client_details().unwrap_err(), BrokerError::NotConnected);
    }

    #[test]
    fn account_from_credentials() {
        let broker = DegiroBroker::new(Credentials::new("u", "p").with_int_account(7));
        assert_eq!(broker.int_account(), Some(7));
    }

    #[test]
    fn typed_code_wins_over_secret() {
        let broker = DegiroBroker::new(
            Credentials::new("u", "p")
                .with_totp_secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ")
                .with_one_time_password("123456"),
        );
        let code = broker.one_time_password().unwrap().unwrap();
        assert_eq!(code.as_str(), "123456");
    }

    #[test]
    fn no_code_without_2fa() {
        let broker = DegiroBroker::new(Credentials::new("u", "p"));
        assert!(broker.one_time_password().unwrap().is_none());
    }

    #[test]
    fn bad_secret_fails_before_network() {
        let mut broker = DegiroBroker::new(Credentials::new("u", "p").with_totp_secret("!!"))
            .with_base_url("http://127.0.0.1:9");
        assert!(matches!(
            broker.connect(),
            Err(BrokerError::InvalidTotpSecret(_))
        ));
    }

    #[test]
    fn empty_product_list_needs_no_session() {
        let broker = DegiroBroker::new(Credentials::new("u", "p"));
        assert!(broker.products_info(&[]).unwrap().is_empty());
    }
}
