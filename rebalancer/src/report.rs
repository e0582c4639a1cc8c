//! Human-readable and JSON rendering of plans and snapshots.

use std::fmt;

use costbook::{PlanWarning, PortfolioSnapshot, RebalancePlan, RebalancingRow};

use crate::error::Result;

/// Plan table followed by the join notes and the three cash lines.
pub struct PlanReport<'a> {
    plan: &'a RebalancePlan,
}

impl<'a> PlanReport<'a> {
    pub fn new(plan: &'a RebalancePlan) -> Self {
        Self { plan }
    }

    /// The whole plan (rows, scalars, join report) as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self.plan)?)
    }

    /// The three closing lines, newline-joined.
    pub fn summary_lines(&self) -> String {
        [
            format!(
                "Amount currently available to trade: €{:.2}",
                self.plan.cash_available
            ),
            format!(
                "Deposit needed for buy/sell rebalancing: €{:.2}",
                self.plan.deposit_needed_buy_sell()
            ),
            format!(
                "Deposit needed for buy-only rebalancing: €{:.2}",
                self.plan.deposit_needed_buy_only()
            ),
        ]
        .join("\n")
    }

    /// Notes on instruments left out of the join.
    pub fn join_notes(&self) -> Vec<String> {
        self.plan
            .warnings()
            .into_iter()
            .filter(|w| {
                matches!(
                    w,
                    PlanWarning::HistoryOnly(_)
                        | PlanWarning::PortfolioOnly(_)
                        | PlanWarning::ZeroTargetSkipped(_)
                )
            })
            .map(|w| format!("Note: {w}"))
            .collect()
    }
}

const HEADER: [&str; 13] = [
    "id", "value", "price", "current%", "target%", "name", "isin", "symbol", "buy/sell %",
    "buy/sell", "units", "buy-only", "units",
];

fn write_row(f: &mut fmt::Formatter<'_>, row: &RebalancingRow) -> fmt::Result {
    let (name, isin, symbol) = match &row.info {
        Some(info) => (info.name.as_str(), info.isin.as_str(), info.symbol.as_str()),
        None => ("", "", ""),
    };
    writeln!(
        f,
        "{:>10} {:>10.2} {:>8.2} {:>8.2} {:>8.2}  {:<30.30} {:<12} {:<6} {:>10.2} {:>10.2} {:>6} {:>10.2} {:>6}",
        row.product.0,
        row.value,
        row.price,
        row.current_ratio * 100.0,
        row.target_ratio * 100.0,
        name,
        isin,
        symbol,
        row.delta_percent,
        row.delta_value,
        row.delta_units,
        row.buy_only_value,
        row.buy_only_units,
    )
}

impl fmt::Display for PlanReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.plan.is_empty() {
            writeln!(f, "No instrument to rebalance.")?;
        } else {
            let h = HEADER;
            writeln!(
                f,
                "{:>10} {:>10} {:>8} {:>8} {:>8}  {:<30} {:<12} {:<6} {:>10} {:>10} {:>6} {:>10} {:>6}",
                h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8], h[9], h[10], h[11], h[12],
            )?;
            for row in &self.plan.rows {
                write_row(f, row)?;
            }
        }

        let notes = self.join_notes();
        if !notes.is_empty() {
            writeln!(f)?;
            for note in notes {
                writeln!(f, "{note}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", self.summary_lines())
    }
}

/// Cash plus one line per held product.
pub struct PositionsReport<'a>(pub &'a PortfolioSnapshot);

impl fmt::Display for PositionsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.0;
        writeln!(f, "Cash: €{:.2}", snapshot.cash())?;
        if snapshot.is_cash_only() {
            return writeln!(f, "No positions.");
        }

        writeln!(f, "CURRENT PORTFOLIO:")?;
        for pos in snapshot.positions() {
            writeln!(
                f,
                "  {:>10} €{:>10.2} @ €{:>8.2}  ({:.1}%)",
                pos.product.0,
                pos.value,
                pos.price,
                pos.current_ratio * 100.0,
            )?;
        }
        writeln!(f, "Total value: €{:.2}", snapshot.total_value())
    }
}
