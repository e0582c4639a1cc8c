//! Mock broker for testing - implements the `Broker` trait with canned data.
//!
//! Use this in integration tests to simulate broker responses without network calls.
//!
//! ```
//! use chrono::NaiveDate;
//! use costbook::ProductId;
//! use costbook_broker::mock::MockBroker;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let broker = MockBroker::builder()
//!     .with_int_account(1234567)
//!     .with_transaction(day, ProductId(332111), 10.0, -600.0)
//!     .with_position(ProductId(332111), 640.0, 64.0)
//!     .with_cash("EUR", 25.0)
//!     .build();
//! ```

use std::sync::Mutex;

use chrono::NaiveDate;
use costbook::{PositionRecord, ProductCatalog, ProductId, ProductInfo, Transaction};

use crate::Broker;
use crate::error::BrokerError;
use crate::types::ClientDetails;

/// A broker call that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    Connect,
    ClientDetails,
    Transactions,
    ProductsInfo,
    Portfolio,
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    int_account: i64,
    account_on_connect: bool,
    transactions: Vec<(NaiveDate, Transaction)>,
    positions: Vec<PositionRecord>,
    catalog: ProductCatalog,
    failures: Vec<(FailPoint, BrokerError)>,
}

impl MockBrokerBuilder {
    pub fn with_int_account(mut self, int_account: i64) -> Self {
        self.int_account = int_account;
        self
    }

    /// Report the account number from `connect` on, like a broker that
    /// looks it up during login.
    pub fn with_account_resolved_on_connect(mut self) -> Self {
        self.account_on_connect = true;
        self
    }

    pub fn with_transaction(
        mut self,
        date: NaiveDate,
        product: ProductId,
        quantity: f64,
        total: f64,
    ) -> Self {
        self.transactions
            .push((date, Transaction::new(product, quantity, total)));
        self
    }

    pub fn with_position(mut self, product: ProductId, value: f64, price: f64) -> Self {
        self.positions
            .push(PositionRecord::product(product, value, price));
        self
    }

    pub fn with_cash(mut self, id: &str, value: f64) -> Self {
        self.positions.push(PositionRecord::cash(id, value));
        self
    }

    /// Push a raw snapshot row as-is.
    pub fn with_record(mut self, record: PositionRecord) -> Self {
        self.positions.push(record);
        self
    }

    pub fn with_product_info(mut self, product: ProductId, name: &str, isin: &str, symbol: &str) -> Self {
        self.catalog.insert(
            product,
            ProductInfo {
                name: name.to_string(),
                isin: isin.to_string(),
                symbol: symbol.to_string(),
            },
        );
        self
    }

    /// Make a call return `error` instead of data.
    pub fn fail_at(mut self, point: FailPoint, error: BrokerError) -> Self {
        self.failures.push((point, error));
        self
    }

    pub fn build(self) -> MockBroker {
        MockBroker {
            connected: false,
            int_account: self.int_account,
            account_on_connect: self.account_on_connect,
            transactions: self.transactions,
            positions: self.positions,
            catalog: self.catalog,
            failures: self.failures,
            requested_ranges: Mutex::new(Vec::new()),
            requested_products: Mutex::new(Vec::new()),
        }
    }
}

/// A mock broker that serves canned data and records what was asked for.
pub struct MockBroker {
    connected: bool,
    int_account: i64,
    account_on_connect: bool,
    transactions: Vec<(NaiveDate, Transaction)>,
    positions: Vec<PositionRecord>,
    catalog: ProductCatalog,
    failures: Vec<(FailPoint, BrokerError)>,
    requested_ranges: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    requested_products: Mutex<Vec<Vec<ProductId>>>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            int_account: 1_000_001,
            account_on_connect: false,
            transactions: Vec::new(),
            positions: Vec::new(),
            catalog: ProductCatalog::default(),
            failures: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Date ranges passed to `transactions` (for assertion in tests).
    pub fn requested_ranges(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.requested_ranges.lock().unwrap().clone()
    }

    /// Product id lists passed to `products_info` (for assertion in tests).
    pub fn requested_products(&self) -> Vec<Vec<ProductId>> {
        self.requested_products.lock().unwrap().clone()
    }

    fn check(&self, point: FailPoint) -> Result<(), BrokerError> {
        if let Some((_, err)) = self.failures.iter().find(|(p, _)| *p == point) {
            return Err(err.clone());
        }
        if point != FailPoint::Connect && !self.connected {
            return Err(BrokerError::NotConnected);
        }
        Ok(())
    }
}

impl Broker for MockBroker {
    fn connect(&mut self) -> Result<(), BrokerError> {
        self.check(FailPoint::Connect)?;
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), BrokerError> {
        self.connected = false;
        Ok(())
    }

    fn int_account(&self) -> Option<i64> {
        (self.connected && self.account_on_connect).then_some(self.int_account)
    }

    fn client_details(&self) -> Result<ClientDetails, BrokerError> {
        self.check(FailPoint::ClientDetails)?;
        Ok(ClientDetails {
            int_account: self.int_account,
            username: None,
        })
    }

    fn transactions(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>, BrokerError> {
        self.check(FailPoint::Transactions)?;
        self.requested_ranges.lock().unwrap().push((from, to));
        Ok(self
            .transactions
            .iter()
            .filter(|(date, _)| *date >= from && *date <= to)
            .map(|(_, tx)| *tx)
            .collect())
    }

    fn products_info(&self, products: &[ProductId]) -> Result<ProductCatalog, BrokerError> {
        self.check(FailPoint::ProductsInfo)?;
        self.requested_products
            .lock()
            .unwrap()
            .push(products.to_vec());
        Ok(products
            .iter()
            .filter_map(|id| self.catalog.get(id).map(|info| (*id, info.clone())))
            .collect())
    }

    fn portfolio(&self) -> Result<Vec<PositionRecord>, BrokerError> {
        self.check(FailPoint::Portfolio)?;
        Ok(self.positions.clone())
    }
}
