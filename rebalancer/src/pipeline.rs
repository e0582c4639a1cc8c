//! Rebalancing workflow: fetch → aggregate → partition → compute → report.
//!
//! This is the main workflow that ties together all components.

use chrono::NaiveDate;
use costbook::{compute_plan, HistoryAggregates, PortfolioSnapshot, RebalancePlan};
use costbook_broker::Broker;
use log::{info, warn};

use crate::broker::{validate_credentials, CodePrompt, Connector};
use crate::config::Config;
use crate::error::Result;
use crate::report::{PlanReport, PositionsReport};

/// Options for a run.
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    pub today: NaiveDate,
    pub json: bool,
}

/// Fetch everything from a connected broker and compute the plan.
pub fn compute(broker: &dyn Broker, config: &Config, today: NaiveDate) -> Result<RebalancePlan> {
    // 1. Transaction history over the reference window
    let (from, to) = config.date_range(today)?;
    let transactions = broker.transactions(from, to)?;
    info!("Fetched {} transactions ({from} - {to})", transactions.len());
    let history = HistoryAggregates::from_transactions(&transactions)?;

    // 2. Product metadata for every instrument in the history
    let products = history.products();
    let catalog = broker.products_info(&products)?;
    if catalog.len() < products.len() {
        warn!(
            "Product info missing for {} of {} instruments",
            products.len() - catalog.len(),
            products.len()
        );
    }

    // 3. Live portfolio
    let records = broker.portfolio()?;
    let snapshot = PortfolioSnapshot::partition(&records)?;
    info!(
        "Fetched {} portfolio rows: {} products, cash {:.2}",
        records.len(),
        snapshot.positions().len(),
        snapshot.cash()
    );

    // 4. Plan
    let mut plan = compute_plan(&history, &snapshot, &config.plan_options())?;
    plan.annotate(&catalog);
    for warning in plan.warnings() {
        warn!("{warning}");
    }
    Ok(plan)
}

/// Execute a full run: validate credentials, compute, print.
pub fn run(
    config: &Config,
    connector: &mut dyn Connector,
    prompt: &mut dyn CodePrompt,
    opts: &RunOptions,
) -> Result<()> {
    let session = validate_credentials(config, connector, prompt)?;
    let plan = compute(session.broker.as_ref(), config, opts.today)?;
    session.close();

    let report = PlanReport::new(&plan);
    if opts.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{report}");
    }
    Ok(())
}

/// Fetch and partition the live portfolio.
pub fn positions(broker: &dyn Broker) -> Result<PortfolioSnapshot> {
    let records = broker.portfolio()?;
    Ok(PortfolioSnapshot::partition(&records)?)
}

/// Show the partitioned portfolio.
pub fn show_positions(
    config: &Config,
    connector: &mut dyn Connector,
    prompt: &mut dyn CodePrompt,
    json: bool,
) -> Result<()> {
    let session = validate_credentials(config, connector, prompt)?;
    let snapshot = positions(session.broker.as_ref())?;
    session.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", PositionsReport(&snapshot));
    }
    Ok(())
}

/// Check that the credentials open a session.
pub fn check_status(
    config: &Config,
    connector: &mut dyn Connector,
    prompt: &mut dyn CodePrompt,
) -> Result<()> {
    info!("Connecting as {}", config.username);
    let session = validate_credentials(config, connector, prompt)?;
    println!("Connection OK");
    if let Some(account) = session.int_account() {
        println!("Account {account}");
    }
    session.close();
    Ok(())
}
