// Path: crates/cli/src/main.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Ledger CLI
//!
//! Runs the end-to-end client demo against an in-memory ledger network and manages
//! client configuration files.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use ledger_telemetry::init::{init_tracing, LogFormat};

mod commands;

use commands::*;

#[derive(Parser, Debug)]
#[clap(
    name = "ledger-cli",
    version,
    about = "Query/invoke demo client for a permissioned ledger network.",
    long_about = "Runs the invoke/query/history demo flow through the ledger client façade and generates or checks client.toml files."
)]
struct Cli {
    /// Log output format (written to stderr).
    #[clap(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatArg,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Pretty => LogFormat::Pretty,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize, invoke, query and read the history of a key, then close.
    Demo(demo::DemoArgs),

    /// Generate and validate client configurations.
    Config(config::ConfigCmdArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format.into(), "info")?;

    match cli.command {
        Commands::Demo(args) => demo::run(args).await,
        Commands::Config(args) => config::run(args),
    }
}
