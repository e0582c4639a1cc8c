//! Brokerage collaborator for costbook.
//!
//! Provides a `Broker` trait covering the three fetches the calculator needs
//! (transaction history, product metadata, live portfolio) plus the account
//! lookup used while validating credentials. Implementations:
//!
//! - **DeGiro** (feature `degiro`): DeGiro web API over blocking HTTP
//! - **Mock** (always): configurable in-memory broker for tests

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "degiro")]
pub mod degiro;

pub use error::BrokerError;
pub use types::*;

use chrono::NaiveDate;
use costbook::{PositionRecord, ProductCatalog, ProductId, Transaction};

/// A broker session that can fetch account history and holdings.
pub trait Broker {
    /// Log in and open a session.
    fn connect(&mut self) -> Result<(), BrokerError>;

    /// Drop the session.
    fn disconnect(&mut self) -> Result<(), BrokerError>;

    /// Account number the session already knows, either configured or
    /// resolved while connecting. `None` means `client_details` must be asked.
    fn int_account(&self) -> Option<i64> {
        None
    }

    /// Account details, including the integer account number.
    fn client_details(&self) -> Result<ClientDetails, BrokerError>;

    /// Transactions executed between `from` and `to`, both inclusive.
    fn transactions(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>, BrokerError>;

    /// Display metadata for the given products. Unknown ids are absent.
    fn products_info(&self, products: &[ProductId]) -> Result<ProductCatalog, BrokerError>;

    /// Current portfolio rows, cash and products alike.
    fn portfolio(&self) -> Result<Vec<PositionRecord>, BrokerError>;
}
