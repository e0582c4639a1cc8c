//! Transaction fee schedule.

/// Flat fee charged once per traded instrument.
///
/// ```
/// use costbook::FeeSchedule;
///
/// let fees = FeeSchedule::flat(2.50);
/// // Two instruments traded, one untouched: 2 x 2.50 leaves the account.
/// assert_eq!(fees.fees_for([3, 0, -1]), -5.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeeSchedule {
    /// Fee per order, in account currency.
    pub per_trade: f64,
}

impl FeeSchedule {
    /// The broker's standard per-order cost.
    pub const DEFAULT_PER_TRADE: f64 = 2.50;

    pub fn flat(per_trade: f64) -> Self {
        Self { per_trade }
    }

    /// A schedule without fees.
    pub fn zero() -> Self {
        Self::flat(0.0)
    }

    /// Number of orders a set of unit deltas produces (non-zero entries).
    pub fn trade_count(units: impl IntoIterator<Item = i64>) -> usize {
        units.into_iter().filter(|&u| u != 0).count()
    }

    /// Fees for a set of unit deltas, as a cash flow (zero or negative).
    ///
    /// No trade costs exactly `0.0`, never `-0.0`.
    pub fn fees_for(&self, units: impl IntoIterator<Item = i64>) -> f64 {
        // Subtracting from +0.0 keeps the sign of a zero fee positive.
        0.0 - self.per_trade * Self::trade_count(units) as f64
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::flat(Self::DEFAULT_PER_TRADE)
    }
}
