//! DeGiro web API response types.

use std::collections::HashMap;

use costbook::{PositionRecord, PositionType, ProductInfo, ProductId, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BrokerError;

/// Login request body (POST /login/secure/login[/totp]).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub is_pass_code_reset: bool,
    pub is_redirect_to_mobile: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_time_password: Option<&'a str>,
}

/// Login response. `status` 0 means the session was opened.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Generic `{"data": ...}` envelope used by most endpoints.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Per-session service URLs (GET /login/secure/config).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUrls {
    pub pa_url: String,
    pub reporting_url: String,
    pub product_search_url: String,
    pub trading_url: String,
}

impl ServiceUrls {
    /// Make every URL end with a slash so paths can be appended directly.
    pub fn normalized(mut self) -> Self {
        for url in [
            &mut self.pa_url,
            &mut self.reporting_url,
            &mut self.product_search_url,
            &mut self.trading_url,
        ] {
            if !url.ends_with('/') {
                url.push('/');
            }
        }
        self
    }
}

/// Client details (GET {paUrl}client).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub int_account: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// One executed transaction from the reporting service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntry {
    pub product_id: u64,
    pub quantity: f64,
    pub total: f64,
}

impl From<&TransactionEntry> for Transaction {
    fn from(entry: &TransactionEntry) -> Self {
        Transaction::new(ProductId(entry.product_id), entry.quantity, entry.total)
    }
}

/// Product metadata from the product search service.
#[derive(Debug, Deserialize)]
pub struct ProductEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub isin: String,
    #[serde(default)]
    pub symbol: String,
}

impl From<ProductEntry> for ProductInfo {
    fn from(entry: ProductEntry) -> Self {
        ProductInfo {
            name: entry.name,
            isin: entry.isin,
            symbol: entry.symbol,
        }
    }
}

/// `data` of the products info response: product id string to metadata.
pub type ProductsInfoData = HashMap<String, ProductEntry>;

/// Update response (GET {tradingUrl}v5/update/...). Only the portfolio is requested.
#[derive(Debug, Deserialize)]
pub struct UpdateResponse {
    #[serde(default)]
    pub portfolio: Option<PortfolioSection>,
}

#[derive(Debug, Deserialize)]
pub struct PortfolioSection {
    #[serde(default)]
    pub value: Vec<PositionRow>,
}

/// A portfolio row: a list of named cells.
#[derive(Debug, Deserialize)]
pub struct PositionRow {
    #[serde(default)]
    pub value: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
pub struct Cell {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl PositionRow {
    fn cell(&self, name: &str) -> Option<&Value> {
        self.value.iter().find(|c| c.name == name).map(|c| &c.value)
    }

    /// A finite numeric cell. `None` when the cell is absent.
    fn number(&self, id: &str, name: &str) -> Result<Option<f64>, BrokerError> {
        let parsed = match self.cell(name) {
            None => return Ok(None),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match parsed {
            Some(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(BrokerError::UnexpectedResponse(format!(
                "portfolio row {id}: {name} is not a number"
            ))),
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        match self.cell(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Convert to a snapshot record.
    ///
    /// A row without an id, with an unknown position type or without a
    /// usable `value` is rejected, as is a PRODUCT row without a `price`.
    /// Cash rows may omit the price.
    pub fn to_record(&self) -> Result<PositionRecord, BrokerError> {
        let id = self
            .text("id")
            .ok_or_else(|| BrokerError::UnexpectedResponse("portfolio row without id".into()))?;
        let kind = self.text("positionType").ok_or_else(|| {
            BrokerError::UnexpectedResponse(format!("portfolio row {id} without positionType"))
        })?;
        let position_type: PositionType = kind.parse().map_err(|_| {
            BrokerError::UnexpectedResponse(format!("unknown positionType {kind:?} for {id}"))
        })?;
        let missing = |name: &str| {
            BrokerError::UnexpectedResponse(format!("portfolio row {id} without {name}"))
        };
        let value = self.number(&id, "value")?.ok_or_else(|| missing("value"))?;
        let price = match (self.number(&id, "price")?, position_type) {
            (Some(price), _) => price,
            (None, PositionType::Cash) => 0.0,
            (None, PositionType::Product) => return Err(missing("price")),
        };
        Ok(PositionRecord {
            id,
            position_type,
            value,
            price,
        })
    }
}
