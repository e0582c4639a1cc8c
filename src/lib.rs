//! # costbook
//!
//! Rebalancing calculator for a buy-and-hold brokerage account.
//!
//! The desired allocation is not configured anywhere: it is implied by what
//! was bought. Each instrument's **target ratio** is its share of the net
//! historical cost basis; its **current ratio** is its share of today's
//! portfolio value (cash included). The plan says how many units to buy or
//! sell to bring the two back in line.
//!
//! ## Quick Start
//!
//! ```
//! use costbook::{
//!     compute_plan, HistoryAggregates, PlanOptions, PortfolioSnapshot, PositionRecord,
//!     ProductId, Transaction,
//! };
//!
//! let world = ProductId(4586985);
//! let bonds = ProductId(1157647);
//!
//! // Purchases are negative totals (cash out).
//! let history = HistoryAggregates::from_transactions(&[
//!     Transaction::new(world, 60.0, -600.0),
//!     Transaction::new(bonds, 40.0, -400.0),
//! ])?;
//!
//! let snapshot = PortfolioSnapshot::partition(&[
//!     PositionRecord::cash("EUR", 0.0),
//!     PositionRecord::product(world, 800.0, 10.0),
//!     PositionRecord::product(bonds, 200.0, 10.0),
//! ])?;
//!
//! let plan = compute_plan(&history, &snapshot, &PlanOptions::default())?;
//!
//! // Over-weight: sell. Under-weight: buy.
//! assert!(plan.row(world).unwrap().delta_units < 0);
//! assert!(plan.row(bonds).unwrap().delta_units > 0);
//!
//! // Buy-only never touches the anchor.
//! assert_eq!(plan.anchor, Some(world));
//! assert_eq!(plan.row(world).unwrap().buy_only_units, 0);
//! # Ok::<(), costbook::CalcError>(())
//! ```
//!
//! ## Degenerate inputs
//!
//! | Input | Outcome |
//! |-------|---------|
//! | no transactions | empty aggregates, empty plan |
//! | historical totals sum to zero | [`CalcError::ZeroHistoryTotal`] |
//! | no product positions | cash-only snapshot, empty plan |
//! | joined instrument with zero target | [`CalcError::ZeroTargetRatio`] or skipped, per [`ZeroTargetPolicy`] |
//! | instrument on one side of the join only | dropped, listed in [`JoinReport`] |
//! | `NaN` or infinite quantity, total, value or price | [`CalcError::NonFiniteValue`] |

mod error;
mod fees;
mod history;
pub mod plan;
mod snapshot;
mod types;

pub use error::{CalcError, Result};
pub use fees::FeeSchedule;
pub use history::{HistoryAggregates, InstrumentHistory};
pub use plan::{
    compute_plan, JoinReport, PlanOptions, PlanWarning, RebalancePlan, RebalancingRow,
    StrategySummary, ZeroTargetPolicy,
};
pub use snapshot::{PortfolioPosition, PortfolioSnapshot};
pub use types::{PositionRecord, PositionType, ProductCatalog, ProductId, ProductInfo, Transaction};
