//! CLI entry point for the costbook rebalancer.

use std::path::PathBuf;
use std::process;

use chrono::Local;
use clap::{Parser, Subcommand};

use costbook_rebalancer::broker::{CodePrompt, DegiroConnector, NoPrompt, TerminalPrompt};
use costbook_rebalancer::config::{Config, Overrides, DEFAULT_CONFIG_DIR};
use costbook_rebalancer::pipeline::{self, RunOptions};

const EXIT_USAGE: i32 = 64;
const EXIT_FATAL: i32 = 1;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Rebalancing calculator: DeGiro cost-basis targets versus live holdings")]
#[command(version)]
struct Cli {
    /// Directory holding <account>.json (or <account>.toml)
    #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Never prompt for a one-time password
    #[arg(long, global = true)]
    no_input: bool,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch history and portfolio, print the rebalancing plan
    Run {
        /// Account name (config file stem)
        account: String,

        /// Per-trade cost, overriding the config
        #[arg(long)]
        transaction_cost: Option<f64>,

        /// Skip instruments with a zero target ratio instead of failing
        #[arg(long)]
        skip_zero_target: bool,
    },

    /// Show cash and current product positions
    Positions {
        /// Account name (config file stem)
        account: String,
    },

    /// Check that the credentials open a session
    Status {
        /// Account name (config file stem)
        account: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            process::exit(EXIT_USAGE);
        }
    };

    let today = Local::now().date_naive();
    let (account, overrides) = match &cli.command {
        Command::Run {
            account,
            transaction_cost,
            skip_zero_target,
        } => (
            account,
            Overrides {
                transaction_cost: *transaction_cost,
                skip_zero_target: *skip_zero_target,
            },
        ),
        Command::Positions { account } | Command::Status { account } => {
            (account, Overrides::default())
        }
    };

    let config = match Config::for_account(&cli.config_dir, account, today)
        .and_then(|c| c.with_overrides(&overrides, today))
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    let mut connector = DegiroConnector {
        timeout: config.timeout(),
    };
    let mut prompt: Box<dyn CodePrompt> = if cli.no_input {
        Box::new(NoPrompt)
    } else {
        Box::new(TerminalPrompt)
    };

    let result = match cli.command {
        Command::Run { .. } => {
            let opts = RunOptions {
                today,
                json: cli.json,
            };
            pipeline::run(&config, &mut connector, prompt.as_mut(), &opts)
        }
        Command::Positions { .. } => {
            pipeline::show_positions(&config, &mut connector, prompt.as_mut(), cli.json)
        }
        Command::Status { .. } => pipeline::check_status(&config, &mut connector, prompt.as_mut()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(EXIT_FATAL);
    }
}
