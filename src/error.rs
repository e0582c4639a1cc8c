//! Calculation errors.

use crate::types::ProductId;

/// Errors returned by the aggregation, partition and plan steps.
///
/// Every divisor the calculator uses is checked up front and non-finite
/// inputs are refused, so a plan never carries `NaN` or infinite figures.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CalcError {
    /// Historical totals sum to zero, so target ratios are 0/0.
    #[error("division by zero: historical transaction totals sum to zero")]
    ZeroHistoryTotal,

    /// A joined instrument has a target ratio of exactly zero.
    #[error("division by zero: target ratio of product {product} is zero")]
    ZeroTargetRatio { product: ProductId },

    /// Units cannot be derived from a zero or negative unit price.
    #[error("price of product {product} is not positive ({price})")]
    NonPositivePrice { product: ProductId, price: f64 },

    /// Cash plus product values is zero while products are held.
    #[error("division by zero: portfolio value (cash + products) is zero")]
    ZeroPortfolioValue,

    /// A transaction or product row carrying `NaN` or an infinity.
    #[error("non-finite {field} for product {product}: {value}")]
    NonFiniteValue {
        product: ProductId,
        field: &'static str,
        value: f64,
    },

    /// A CASH row carrying `NaN` or an infinity.
    #[error("non-finite cash balance in row {id:?}: {value}")]
    NonFiniteCash { id: String, value: f64 },

    /// A PRODUCT row whose id is not a numeric product id.
    #[error("invalid product id in portfolio snapshot: {0:?}")]
    InvalidProductId(String),
}

pub type Result<T> = std::result::Result<T, CalcError>;
