//! Core types: ProductId, Transaction, PositionType, PositionRecord, ProductInfo

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;

/// Broker-assigned instrument identifier.
///
/// DeGiro exposes product ids as integers in the transaction history and
/// as numeric strings in the portfolio snapshot; both map to this key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ProductId)
    }
}

/// One historical transaction, reduced to what the aggregation needs.
///
/// `total` is signed the broker's way: purchases are negative (cash out),
/// sales positive.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    pub product: ProductId,
    pub quantity: f64,
    pub total: f64,
}

impl Transaction {
    pub fn new(product: ProductId, quantity: f64, total: f64) -> Self {
        Self {
            product,
            quantity,
            total,
        }
    }
}

/// Discriminator on a live portfolio row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum PositionType {
    Cash,
    Product,
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionType::Cash => write!(f, "CASH"),
            PositionType::Product => write!(f, "PRODUCT"),
        }
    }
}

impl FromStr for PositionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(PositionType::Cash),
            "PRODUCT" => Ok(PositionType::Product),
            other => Err(format!("unknown position type: {other}")),
        }
    }
}

/// A raw row of the live portfolio snapshot.
///
/// Cash rows carry currency-like ids (`"EUR"`, `"FLATEX_EUR"`), product
/// rows carry numeric ids, so the id stays a string until partitioning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionRecord {
    pub id: String,
    pub position_type: PositionType,
    pub value: f64,
    pub price: f64,
}

impl PositionRecord {
    pub fn cash(id: &str, value: f64) -> Self {
        Self {
            id: id.to_string(),
            position_type: PositionType::Cash,
            value,
            price: 1.0,
        }
    }

    pub fn product(product: ProductId, value: f64, price: f64) -> Self {
        Self {
            id: product.to_string(),
            position_type: PositionType::Product,
            value,
            price,
        }
    }
}

/// Display metadata for an instrument. Plays no part in the arithmetic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProductInfo {
    pub name: String,
    pub isin: String,
    pub symbol: String,
}

/// Product metadata keyed by id.
pub type ProductCatalog = FxHashMap<ProductId, ProductInfo>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_parse() {
        assert_eq!("332111".parse::<ProductId>().unwrap(), ProductId(332111));
        assert_eq!(" 42 ".parse::<ProductId>().unwrap(), ProductId(42));
        assert!("EUR".parse::<ProductId>().is_err());
        assert!("".parse::<ProductId>().is_err());
    }

    #[test]
    fn product_id_display() {
        assert_eq!(format!("{}", ProductId(4586985)), "4586985");
    }

    #[test]
    fn product_id_ordering() {
        assert!(ProductId(1) < ProductId(2));
    }

    #[test]
    fn position_type_round_trip_text() {
        assert_eq!("CASH".parse::<PositionType>().unwrap(), PositionType::Cash);
        assert_eq!(
            "PRODUCT".parse::<PositionType>().unwrap(),
            PositionType::Product
        );
        assert!("cash".parse::<PositionType>().is_err());
        assert_eq!(PositionType::Product.to_string(), "PRODUCT");
    }

    #[test]
    fn record_constructors() {
        let cash = PositionRecord::cash("EUR", 125.5);
        assert_eq!(cash.position_type, PositionType::Cash);
        let p = PositionRecord::product(ProductId(7), 100.0, 10.0);
        assert_eq!(p.id, "7");
        assert_eq!(p.position_type, PositionType::Product);
    }
}
