use crate::infra::{build_engine, parse_date, parse_rule};
use crate::server;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use contract_lifecycle::config::AppConfig;
use contract_lifecycle::error::AppError;
use contract_lifecycle::telemetry;
use contract_lifecycle::workflows::post_sales::{response::trigger_failure, ApiResponse, RuleKind};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Contract Lifecycle Engine",
    about = "Serve or run the post-sales contract status transition rules",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run a single rule once and print the result envelope
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Directory of CSV seed files for the in-memory store
    #[arg(long)]
    pub(crate) seed_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Rule slug (e.g. `renewal-window-date`) or name (e.g. `RenewalWindowDate`)
    #[arg(value_parser = parse_rule)]
    pub(crate) rule: RuleKind,
    /// Evaluate as of this date (YYYY-MM-DD) instead of today
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Directory of CSV seed files for the in-memory store
    #[arg(long)]
    pub(crate) seed_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Run(args) => run_rule(args).await,
    }
}

async fn run_rule(args: RunArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let seed_dir = args.seed_dir.or(config.engine.seed_dir.clone());
    let engine = build_engine(&config.engine, seed_dir.as_deref()).await?;

    match engine.trigger(args.rule, args.date).await {
        Ok(outcome) => {
            print_envelope(&ApiResponse::from(outcome));
            Ok(())
        }
        Err(err) => {
            print_envelope(&trigger_failure(args.rule.operation(), &err));
            Err(err.into())
        }
    }
}

fn print_envelope<T: serde::Serialize>(envelope: &ApiResponse<T>) {
    match serde_json::to_string_pretty(envelope) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to render result: {err}"),
    }
}
