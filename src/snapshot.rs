//! Live portfolio snapshot: cash versus product positions.

use rustc_hash::FxHashMap;

use crate::error::{CalcError, Result};
use crate::types::{PositionRecord, PositionType, ProductId};

/// A held product with its share of the current portfolio value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioPosition {
    pub product: ProductId,
    pub value: f64,
    pub price: f64,
    /// `value / (cash + sum of product values)`.
    pub current_ratio: f64,
}

/// Partitioned snapshot: summed cash plus product positions ordered by id.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioSnapshot {
    cash: f64,
    positions: Vec<PortfolioPosition>,
}

impl PortfolioSnapshot {
    /// Split raw snapshot rows into cash and product positions.
    ///
    /// Cash is the sum of every CASH row (0 when there is none). Product rows
    /// repeated under the same id are merged: values add up, the last price
    /// wins. With no product rows the snapshot is cash-only.
    ///
    /// A `NaN` or infinite value or price is rejected before any ratio is
    /// derived from it.
    pub fn partition(records: &[PositionRecord]) -> Result<Self> {
        let mut cash = 0.0;
        let mut products: FxHashMap<ProductId, (f64, f64)> = FxHashMap::default();

        for record in records {
            match record.position_type {
                PositionType::Cash => {
                    if !record.value.is_finite() {
                        return Err(CalcError::NonFiniteCash {
                            id: record.id.clone(),
                            value: record.value,
                        });
                    }
                    cash += record.value;
                }
                PositionType::Product => {
                    let product: ProductId = record
                        .id
                        .parse()
                        .map_err(|_| CalcError::InvalidProductId(record.id.clone()))?;
                    for (field, value) in [("value", record.value), ("price", record.price)] {
                        if !value.is_finite() {
                            return Err(CalcError::NonFiniteValue {
                                product,
                                field,
                                value,
                            });
                        }
                    }
                    let slot = products.entry(product).or_insert((0.0, record.price));
                    slot.0 += record.value;
                    slot.1 = record.price;
                }
            }
        }

        let mut positions: Vec<PortfolioPosition> = products
            .into_iter()
            .map(|(product, (value, price))| PortfolioPosition {
                product,
                value,
                price,
                current_ratio: 0.0,
            })
            .collect();
        positions.sort_by_key(|p| p.product);

        if !positions.is_empty() {
            let total = cash + positions.iter().map(|p| p.value).sum::<f64>();
            if total == 0.0 {
                return Err(CalcError::ZeroPortfolioValue);
            }
            for position in &mut positions {
                position.current_ratio = position.value / total;
            }
        }

        Ok(Self { cash, positions })
    }

    /// Cash available to trade.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn positions(&self) -> &[PortfolioPosition] {
        &self.positions
    }

    pub fn get(&self, product: ProductId) -> Option<&PortfolioPosition> {
        self.positions
            .binary_search_by(|p| p.product.cmp(&product))
            .ok()
            .map(|i| &self.positions[i])
    }

    /// Sum of product market values (cash excluded).
    pub fn products_value(&self) -> f64 {
        self.positions.iter().map(|p| p.value).sum()
    }

    /// Cash plus product values: the denominator of every current ratio.
    pub fn total_value(&self) -> f64 {
        self.cash + self.products_value()
    }

    /// Same snapshot with a different cash balance, ratios recomputed.
    pub fn with_cash(&self, cash: f64) -> Result<Self> {
        let mut records: Vec<PositionRecord> = self
            .positions
            .iter()
            .map(|p| PositionRecord::product(p.product, p.value, p.price))
            .collect();
        records.push(PositionRecord::cash("CASH", cash));
        Self::partition(&records)
    }

    /// True when no product is held.
    pub fn is_cash_only(&self) -> bool {
        self.positions.is_empty()
    }

    /// Snapshot built without any validation, as a deserialized one can be.
    #[cfg(test)]
    pub(crate) fn from_parts_unchecked(cash: f64, positions: Vec<PortfolioPosition>) -> Self {
        Self { cash, positions }
    }
}
