//! costbook-rebalancer: DeGiro rebalancing calculator.
//!
//! Reads a per-account configuration, logs in to DeGiro, fetches the
//! transaction history, product metadata and live portfolio, and prints
//! how many units to buy or sell to restore the cost-basis allocation.

pub mod broker;
pub mod config;
pub mod dates;
pub mod error;
pub mod pipeline;
pub mod report;
