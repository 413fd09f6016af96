//! Sleepwave command-line front end
//!
//! JSON goes to stdout, logs go to stderr.

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Command};
use sleepwave_stream::Verbosity;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    init_tracing(verbosity);

    match cli.command {
        Command::Info(args) => commands::info::execute(args),
        Command::Stream(args) => commands::stream::execute(args, verbosity).await,
        Command::Generate(args) => commands::generate::execute(args),
    }
}

/// `RUST_LOG` wins over the verbosity flags when set
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
