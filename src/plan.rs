//! Rebalancing plan: historical ratio vs current ratio, per instrument.
//!
//! Two strategies are computed on every joined instrument:
//!
//! - **buy/sell**: move each position by `(1 - current/target)` of its own
//!   value, buying under-weight and selling over-weight instruments.
//! - **buy-only**: take the instrument with the most negative buy/sell delta
//!   as anchor, derive the portfolio value at which the anchor is exactly on
//!   target (`value_k / target_k`), and top every other position up to its
//!   target share of that value.
//!
//! Each strategy reports the net cash flow of its orders, the flat fees and
//! the deposit needed when cash does not cover both.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::error::{CalcError, Result};
use crate::fees::FeeSchedule;
use crate::history::HistoryAggregates;
use crate::snapshot::PortfolioSnapshot;
use crate::types::{ProductCatalog, ProductId, ProductInfo};

/// What to do with a joined instrument whose target ratio is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ZeroTargetPolicy {
    /// Abort with [`CalcError::ZeroTargetRatio`].
    #[default]
    Fail,
    /// Drop the instrument from the join and list it in the [`JoinReport`].
    Skip,
}

/// Plan parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlanOptions {
    pub fees: FeeSchedule,
    pub zero_target: ZeroTargetPolicy,
}

impl PlanOptions {
    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_zero_target(mut self, policy: ZeroTargetPolicy) -> Self {
        self.zero_target = policy;
        self
    }
}

/// One joined instrument with both strategies' orders.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RebalancingRow {
    pub product: ProductId,
    pub value: f64,
    pub price: f64,
    pub current_ratio: f64,
    pub target_ratio: f64,
    pub info: Option<ProductInfo>,
    /// `(1 - current/target) * 100`.
    pub delta_percent: f64,
    /// `delta_percent / 100 * value`.
    pub delta_value: f64,
    /// Positive buys, negative sells.
    pub delta_units: i64,
    pub buy_only_value: f64,
    pub buy_only_units: i64,
}

/// Cash effect of one strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StrategySummary {
    /// `-sum(units * price)`: negative when the strategy spends cash.
    pub trade_cash_flow: f64,
    /// Flat fees as a cash flow (zero or negative).
    pub fees: f64,
    /// Instruments with a non-zero order.
    pub trades: usize,
    /// Extra deposit needed so that cash covers trades and fees.
    pub deposit_needed: f64,
}

impl StrategySummary {
    fn from_units(units: &[(i64, f64)], fees: &FeeSchedule, cash: f64) -> Self {
        let trade_cash_flow = 0.0
            - units
                .iter()
                .map(|&(u, price)| u as f64 * price)
                .sum::<f64>();
        let fee_flow = fees.fees_for(units.iter().map(|&(u, _)| u));
        Self {
            trade_cash_flow,
            fees: fee_flow,
            trades: FeeSchedule::trade_count(units.iter().map(|&(u, _)| u)),
            deposit_needed: shortfall(trade_cash_flow + fee_flow + cash),
        }
    }

    /// Deposit the same orders would need with a different cash balance.
    pub fn deposit_with_cash(&self, cash: f64) -> f64 {
        shortfall(self.trade_cash_flow + self.fees + cash)
    }
}

/// `-min(0, balance)`, never negative zero.
pub fn shortfall(balance: f64) -> f64 {
    if balance < 0.0 { -balance } else { 0.0 }
}

/// Instruments that did not make it into the plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct JoinReport {
    /// Bought historically, not held anymore.
    pub history_only: Vec<ProductId>,
    /// Held now, no purchase in the reference period.
    pub portfolio_only: Vec<ProductId>,
    /// Joined but dropped because their target ratio is zero.
    pub zero_target_skipped: Vec<ProductId>,
    pub history_len: usize,
    pub portfolio_len: usize,
}

impl JoinReport {
    pub fn dropped(&self) -> usize {
        self.history_only.len() + self.portfolio_only.len() + self.zero_target_skipped.len()
    }
}

/// Non-fatal conditions a caller should surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanWarning {
    EmptyHistory,
    EmptyPortfolio,
    EmptyJoin,
    HistoryOnly(Vec<ProductId>),
    PortfolioOnly(Vec<ProductId>),
    ZeroTargetSkipped(Vec<ProductId>),
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::EmptyHistory => write!(f, "no transactions in the reference period"),
            PlanWarning::EmptyPortfolio => write!(f, "no product positions in the portfolio"),
            PlanWarning::EmptyJoin => {
                write!(f, "no instrument is both in the history and in the portfolio")
            }
            PlanWarning::HistoryOnly(ids) => write!(
                f,
                "{} instrument(s) in history but not held, ignored: {}",
                ids.len(),
                join_ids(ids)
            ),
            PlanWarning::PortfolioOnly(ids) => write!(
                f,
                "{} held instrument(s) without history, ignored: {}",
                ids.len(),
                join_ids(ids)
            ),
            PlanWarning::ZeroTargetSkipped(ids) => write!(
                f,
                "{} instrument(s) with zero target ratio skipped: {}",
                ids.len(),
                join_ids(ids)
            ),
        }
    }
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The full rebalancing plan.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RebalancePlan {
    /// Joined instruments, ascending product id.
    pub rows: Vec<RebalancingRow>,
    pub cash_available: f64,
    pub buy_sell: StrategySummary,
    pub buy_only: StrategySummary,
    /// Buy-only anchor: first row with the lowest buy/sell delta value.
    pub anchor: Option<ProductId>,
    /// Portfolio value at which the anchor sits exactly on target.
    pub implied_total_value: Option<f64>,
    pub join: JoinReport,
}

impl RebalancePlan {
    pub fn deposit_needed_buy_sell(&self) -> f64 {
        self.buy_sell.deposit_needed
    }

    pub fn deposit_needed_buy_only(&self) -> f64 {
        self.buy_only.deposit_needed
    }

    pub fn row(&self, product: ProductId) -> Option<&RebalancingRow> {
        self.rows.iter().find(|r| r.product == product)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Attach display metadata. Rows missing from the catalog keep `None`.
    pub fn annotate(&mut self, catalog: &ProductCatalog) {
        for row in &mut self.rows {
            row.info = catalog.get(&row.product).cloned();
        }
    }

    pub fn warnings(&self) -> Vec<PlanWarning> {
        let mut warnings = Vec::new();
        if self.join.history_len == 0 {
            warnings.push(PlanWarning::EmptyHistory);
        }
        if self.join.portfolio_len == 0 {
            warnings.push(PlanWarning::EmptyPortfolio);
        }
        if self.rows.is_empty() && self.join.history_len > 0 && self.join.portfolio_len > 0 {
            warnings.push(PlanWarning::EmptyJoin);
        }
        if !self.join.history_only.is_empty() {
            warnings.push(PlanWarning::HistoryOnly(self.join.history_only.clone()));
        }
        if !self.join.portfolio_only.is_empty() {
            warnings.push(PlanWarning::PortfolioOnly(self.join.portfolio_only.clone()));
        }
        if !self.join.zero_target_skipped.is_empty() {
            warnings.push(PlanWarning::ZeroTargetSkipped(
                self.join.zero_target_skipped.clone(),
            ));
        }
        warnings
    }
}

/// Nearest whole unit, ties to even.
fn round_units(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Compute the rebalancing plan.
///
/// Inner join of history and snapshot on product id; instruments on one
/// side only are listed in [`RebalancePlan::join`]. Pure: identical inputs
/// give identical plans.
///
/// # Errors
/// - [`CalcError::ZeroTargetRatio`] for the first joined instrument (by id)
///   with a zero target ratio, unless the policy is [`ZeroTargetPolicy::Skip`].
/// - [`CalcError::NonPositivePrice`] for a joined instrument priced at or
///   below zero, or priced `NaN`.
/// - [`CalcError::NonFiniteValue`] for an infinite price or a non-finite
///   value, which a deserialized snapshot can still carry.
pub fn compute_plan(
    history: &HistoryAggregates,
    snapshot: &PortfolioSnapshot,
    options: &PlanOptions,
) -> Result<RebalancePlan> {
    let cash = snapshot.cash();
    let mut join = JoinReport {
        history_len: history.len(),
        portfolio_len: snapshot.positions().len(),
        ..JoinReport::default()
    };

    let held: FxHashSet<ProductId> = snapshot.positions().iter().map(|p| p.product).collect();
    join.history_only = history
        .iter()
        .map(|h| h.product)
        .filter(|id| !held.contains(id))
        .collect();

    let mut rows = Vec::new();
    for position in snapshot.positions() {
        let Some(hist) = history.get(position.product) else {
            join.portfolio_only.push(position.product);
            continue;
        };

        if hist.target_ratio == 0.0 {
            match options.zero_target {
                ZeroTargetPolicy::Fail => {
                    return Err(CalcError::ZeroTargetRatio {
                        product: position.product,
                    });
                }
                ZeroTargetPolicy::Skip => {
                    join.zero_target_skipped.push(position.product);
                    continue;
                }
            }
        }
        if position.price.is_infinite() {
            return Err(CalcError::NonFiniteValue {
                product: position.product,
                field: "price",
                value: position.price,
            });
        }
        if !position.value.is_finite() {
            return Err(CalcError::NonFiniteValue {
                product: position.product,
                field: "value",
                value: position.value,
            });
        }
        if position.price.is_nan() || position.price <= 0.0 {
            return Err(CalcError::NonPositivePrice {
                product: position.product,
                price: position.price,
            });
        }

        let delta_percent = (1.0 - position.current_ratio / hist.target_ratio) * 100.0;
        let delta_value = delta_percent / 100.0 * position.value;

        rows.push(RebalancingRow {
            product: position.product,
            value: position.value,
            price: position.price,
            current_ratio: position.current_ratio,
            target_ratio: hist.target_ratio,
            info: None,
            delta_percent,
            delta_value,
            delta_units: round_units(delta_value / position.price),
            buy_only_value: 0.0,
            buy_only_units: 0,
        });
    }

    // Replaced only on a strictly lower delta: ties keep the first row.
    let anchor = rows.iter().enumerate().fold(None, |best: Option<usize>, (i, row)| {
        match best {
            Some(b) if rows[b].delta_value <= row.delta_value => Some(b),
            _ => Some(i),
        }
    });

    let implied_total_value = anchor.map(|k| rows[k].value / rows[k].target_ratio);
    if let Some(total) = implied_total_value {
        for row in &mut rows {
            row.buy_only_value = total * row.target_ratio - row.value;
            row.buy_only_units = round_units(row.buy_only_value / row.price);
        }
    }

    let buy_sell_units: Vec<(i64, f64)> = rows.iter().map(|r| (r.delta_units, r.price)).collect();
    let buy_only_units: Vec<(i64, f64)> =
        rows.iter().map(|r| (r.buy_only_units, r.price)).collect();

    Ok(RebalancePlan {
        anchor: anchor.map(|k| rows[k].product),
        implied_total_value,
        buy_sell: StrategySummary::from_units(&buy_sell_units, &options.fees, cash),
        buy_only: StrategySummary::from_units(&buy_only_units, &options.fees, cash),
        cash_available: cash,
        rows,
        join,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::PortfolioPosition;
    use crate::types::PositionRecord;

    fn history(totals: &[(u64, f64)]) -> HistoryAggregates {
        let pairs: Vec<(ProductId, f64)> =
            totals.iter().map(|&(id, t)| (ProductId(id), t)).collect();
        HistoryAggregates::from_totals(&pairs).unwrap()
    }

    fn snapshot(cash: f64, positions: &[(u64, f64, f64)]) -> PortfolioSnapshot {
        let mut records = vec![PositionRecord::cash("EUR", cash)];
        records.extend(
            positions
                .iter()
                .map(|&(id, value, price)| PositionRecord::product(ProductId(id), value, price)),
        );
        PortfolioSnapshot::partition(&records).unwrap()
    }

    #[test]
    fn balanced_portfolio_needs_nothing() {
        let plan = compute_plan(
            &history(&[(1, 600.0), (2, 400.0)]),
            &snapshot(0.0, &[(1, 600.0, 10.0), (2, 400.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();

        assert_eq!(plan.rows.len(), 2);
        for row in &plan.rows {
            assert_eq!(row.delta_units, 0);
            assert_eq!(row.buy_only_units, 0);
        }
        assert_eq!(plan.buy_sell.trades, 0);
        assert_eq!(plan.deposit_needed_buy_sell(), 0.0);
        assert_eq!(plan.deposit_needed_buy_only(), 0.0);
    }

    #[test]
    fn overweight_sells_underweight_buys() {
        let plan = compute_plan(
            &history(&[(1, 600.0), (2, 400.0)]),
            &snapshot(0.0, &[(1, 800.0, 10.0), (2, 200.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();

        let x = plan.row(ProductId(1)).unwrap();
        let y = plan.row(ProductId(2)).unwrap();
        assert!((x.current_ratio - 0.8).abs() < 1e-12);
        assert!((x.delta_percent - (-100.0 / 3.0)).abs() < 1e-9);
        // -33.33% of 800 = -266.67 -> -26.67 units -> -27
        assert_eq!(x.delta_units, -27);
        // (1 - 0.2/0.4) * 200 = 100 -> 10 units
        assert_eq!(y.delta_units, 10);
    }

    #[test]
    fn buy_sell_deposit_accounts_for_fees() {
        let plan = compute_plan(
            &history(&[(1, 600.0), (2, 400.0)]),
            &snapshot(0.0, &[(1, 800.0, 10.0), (2, 200.0, 10.0)]),
            &PlanOptions::default().with_fees(FeeSchedule::flat(2.5)),
        )
        .unwrap();

        // Sell 27 x 10 = +270, buy 10 x 10 = -100 -> +170, fees -5.
        assert!((plan.buy_sell.trade_cash_flow - 170.0).abs() < 1e-9);
        assert_eq!(plan.buy_sell.fees, -5.0);
        assert_eq!(plan.deposit_needed_buy_sell(), 0.0);
    }

    #[test]
    fn buy_only_anchor_is_most_negative_delta() {
        let plan = compute_plan(
            &history(&[(1, 600.0), (2, 400.0)]),
            &snapshot(0.0, &[(1, 800.0, 10.0), (2, 200.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();

        assert_eq!(plan.anchor, Some(ProductId(1)));
        let total = plan.implied_total_value.unwrap();
        assert!((total - 800.0 / 0.6).abs() < 1e-9);

        let x = plan.row(ProductId(1)).unwrap();
        let y = plan.row(ProductId(2)).unwrap();
        assert_eq!(x.buy_only_units, 0);
        // 1333.33 * 0.4 - 200 = 333.33 -> 33 units
        assert_eq!(y.buy_only_units, 33);
        // 33 x 10 spent + 2.50 fee, no cash
        assert!((plan.deposit_needed_buy_only() - 332.5).abs() < 1e-9);
    }

    #[test]
    fn cash_reduces_deposit() {
        let plan = compute_plan(
            &history(&[(1, 600.0), (2, 400.0)]),
            &snapshot(100.0, &[(1, 800.0, 10.0), (2, 200.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();
        assert!(plan.deposit_needed_buy_only() < 332.5);
        assert_eq!(plan.cash_available, 100.0);
    }

    #[test]
    fn zero_target_fails_by_default() {
        let err = compute_plan(
            &history(&[(1, 600.0), (2, 0.0)]),
            &snapshot(0.0, &[(1, 600.0, 10.0), (2, 100.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CalcError::ZeroTargetRatio {
                product: ProductId(2)
            }
        );
    }

    #[test]
    fn zero_target_skip_policy() {
        let plan = compute_plan(
            &history(&[(1, 600.0), (2, 0.0)]),
            &snapshot(0.0, &[(1, 600.0, 10.0), (2, 100.0, 10.0)]),
            &PlanOptions::default().with_zero_target(ZeroTargetPolicy::Skip),
        )
        .unwrap();
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.join.zero_target_skipped, vec![ProductId(2)]);
        assert!(plan
            .warnings()
            .contains(&PlanWarning::ZeroTargetSkipped(vec![ProductId(2)])));
    }

    #[test]
    fn zero_target_not_held_is_harmless() {
        let plan = compute_plan(
            &history(&[(1, 600.0), (2, 0.0)]),
            &snapshot(0.0, &[(1, 600.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.join.history_only, vec![ProductId(2)]);
    }

    #[test]
    fn non_positive_price_rejected() {
        let err = compute_plan(
            &history(&[(1, 600.0)]),
            &snapshot(0.0, &[(1, 600.0, 0.0)]),
            &PlanOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CalcError::NonPositivePrice {
                product: ProductId(1),
                ..
            }
        ));
    }

    fn raw_snapshot(price: f64, value: f64) -> PortfolioSnapshot {
        PortfolioSnapshot::from_parts_unchecked(
            0.0,
            vec![
                PortfolioPosition {
                    product: ProductId(1),
                    value: 800.0,
                    price: 10.0,
                    current_ratio: 0.8,
                },
                PortfolioPosition {
                    product: ProductId(2),
                    value,
                    price,
                    current_ratio: 0.2,
                },
            ],
        )
    }

    #[test]
    fn nan_price_rejected() {
        let err = compute_plan(
            &history(&[(1, 600.0), (2, 400.0)]),
            &raw_snapshot(f64::NAN, 200.0),
            &PlanOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CalcError::NonPositivePrice {
                product: ProductId(2),
                ..
            }
        ));
    }

    #[test]
    fn infinite_price_and_nan_value_rejected() {
        let history = history(&[(1, 600.0), (2, 400.0)]);
        let err = compute_plan(
            &history,
            &raw_snapshot(f64::INFINITY, 200.0),
            &PlanOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CalcError::NonFiniteValue { product: ProductId(2), field: "price", .. }
        ));

        let err = compute_plan(&history, &raw_snapshot(10.0, f64::NAN), &PlanOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CalcError::NonFiniteValue { product: ProductId(2), field: "value", .. }
        ));
    }

    #[test]
    fn join_drops_one_sided_instruments() {
        let plan = compute_plan(
            &history(&[(1, 500.0), (2, 500.0)]),
            &snapshot(0.0, &[(2, 500.0, 10.0), (3, 500.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.rows[0].product, ProductId(2));
        assert_eq!(plan.join.history_only, vec![ProductId(1)]);
        assert_eq!(plan.join.portfolio_only, vec![ProductId(3)]);
        assert_eq!(plan.join.dropped(), 2);
    }

    #[test]
    fn empty_history_gives_empty_plan() {
        let plan = compute_plan(
            &HistoryAggregates::default(),
            &snapshot(50.0, &[(1, 100.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.anchor, None);
        assert_eq!(plan.deposit_needed_buy_sell(), 0.0);
        assert_eq!(plan.warnings()[0], PlanWarning::EmptyHistory);
    }

    #[test]
    fn cash_only_portfolio_does_not_crash() {
        let plan = compute_plan(
            &history(&[(1, 600.0)]),
            &snapshot(250.0, &[]),
            &PlanOptions::default(),
        )
        .unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.cash_available, 250.0);
        assert!(plan.warnings().contains(&PlanWarning::EmptyPortfolio));
    }

    #[test]
    fn negative_cash_alone_needs_deposit() {
        let plan = compute_plan(
            &HistoryAggregates::default(),
            &snapshot(-20.0, &[]),
            &PlanOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.deposit_needed_buy_sell(), 20.0);
        assert_eq!(plan.deposit_needed_buy_only(), 20.0);
    }

    #[test]
    fn anchor_tie_takes_first_row() {
        // Both rows have the same delta value.
        let plan = compute_plan(
            &history(&[(1, 500.0), (2, 500.0)]),
            &snapshot(0.0, &[(1, 500.0, 10.0), (2, 500.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.anchor, Some(ProductId(1)));
    }

    #[test]
    fn annotate_fills_info() {
        let mut plan = compute_plan(
            &history(&[(1, 500.0), (2, 500.0)]),
            &snapshot(0.0, &[(1, 500.0, 10.0), (2, 500.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();
        let mut catalog = ProductCatalog::default();
        catalog.insert(
            ProductId(1),
            ProductInfo {
                name: "Vanguard FTSE All-World".into(),
                isin: "IE00B3RBWM25".into(),
                symbol: "VWRL".into(),
            },
        );
        plan.annotate(&catalog);
        assert_eq!(plan.rows[0].info.as_ref().unwrap().symbol, "VWRL");
        assert!(plan.rows[1].info.is_none());
    }

    #[test]
    fn rounding_ties_to_even() {
        assert_eq!(round_units(2.5), 2);
        assert_eq!(round_units(3.5), 4);
        assert_eq!(round_units(-2.5), -2);
        assert_eq!(round_units(2.6), 3);
    }

    #[test]
    fn untraded_strategy_has_positive_zero_flows() {
        let plan = compute_plan(
            &history(&[(1, 600.0), (2, 400.0)]),
            &snapshot(0.0, &[(1, 600.0, 10.0), (2, 400.0, 10.0)]),
            &PlanOptions::default(),
        )
        .unwrap();
        assert!(plan.buy_sell.fees.is_sign_positive());
        assert!(plan.buy_sell.trade_cash_flow.is_sign_positive());
    }

    #[test]
    fn shortfall_is_never_negative_zero() {
        assert!(shortfall(0.0).is_sign_positive());
        assert!(shortfall(10.0).is_sign_positive());
        assert_eq!(shortfall(-12.5), 12.5);
    }
}
