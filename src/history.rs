//! Historical aggregation: per-instrument net quantity, net total and target ratio.
//!
//! The target ratio of an instrument is its share of the summed historical
//! totals. Purchases are negative totals, so for a buy-and-hold history both
//! numerator and denominator are negative and ratios come out positive.

use crate::error::{CalcError, Result};
use crate::types::{ProductId, Transaction};

/// Aggregate of all transactions on one instrument.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstrumentHistory {
    pub product: ProductId,
    pub net_quantity: f64,
    pub net_total: f64,
    pub target_ratio: f64,
}

/// Aggregates for every instrument seen in the transaction history,
/// ordered by product id.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryAggregates {
    entries: Vec<InstrumentHistory>,
}

impl HistoryAggregates {
    /// Group transactions by product and derive target ratios.
    ///
    /// The result does not depend on input order: transactions are sorted
    /// before summing, so floating-point accumulation happens in the same
    /// sequence for any permutation of the input.
    ///
    /// An empty input yields empty aggregates. A non-empty input whose
    /// totals sum to zero is rejected with [`CalcError::ZeroHistoryTotal`],
    /// and a `NaN` or infinite quantity or total with
    /// [`CalcError::NonFiniteValue`].
    pub fn from_transactions(transactions: &[Transaction]) -> Result<Self> {
        for tx in transactions {
            for (field, value) in [("quantity", tx.quantity), ("total", tx.total)] {
                if !value.is_finite() {
                    return Err(CalcError::NonFiniteValue {
                        product: tx.product,
                        field,
                        value,
                    });
                }
            }
        }

        let mut sorted: Vec<&Transaction> = transactions.iter().collect();
        sorted.sort_by(|a, b| {
            a.product
                .cmp(&b.product)
                .then(a.total.total_cmp(&b.total))
                .then(a.quantity.total_cmp(&b.quantity))
        });

        let mut entries: Vec<InstrumentHistory> = Vec::new();
        for tx in sorted {
            match entries.last_mut() {
                Some(last) if last.product == tx.product => {
                    last.net_quantity += tx.quantity;
                    last.net_total += tx.total;
                }
                _ => entries.push(InstrumentHistory {
                    product: tx.product,
                    net_quantity: tx.quantity,
                    net_total: tx.total,
                    target_ratio: 0.0,
                }),
            }
        }

        if entries.is_empty() {
            return Ok(Self::default());
        }

        let grand_total: f64 = entries.iter().map(|e| e.net_total).sum();
        if grand_total == 0.0 {
            return Err(CalcError::ZeroHistoryTotal);
        }

        for entry in &mut entries {
            entry.target_ratio = entry.net_total / grand_total;
        }

        Ok(Self { entries })
    }

    /// Build aggregates from precomputed `(product, net_total)` pairs.
    ///
    /// Net quantity is left at zero. Useful when the history was summarized
    /// elsewhere.
    pub fn from_totals(totals: &[(ProductId, f64)]) -> Result<Self> {
        let transactions: Vec<Transaction> = totals
            .iter()
            .map(|&(product, total)| Transaction::new(product, 0.0, total))
            .collect();
        Self::from_transactions(&transactions)
    }

    pub fn get(&self, product: ProductId) -> Option<&InstrumentHistory> {
        self.entries
            .binary_search_by(|e| e.product.cmp(&product))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrumentHistory> {
        self.entries.iter()
    }

    /// Product ids in ascending order.
    pub fn products(&self) -> Vec<ProductId> {
        self.entries.iter().map(|e| e.product).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of net totals over all instruments.
    pub fn grand_total(&self) -> f64 {
        self.entries.iter().map(|e| e.net_total).sum()
    }
}
