use anyhow::Context;
use clap::Parser;

use rebalance_flow::cli;
use rebalance_flow::config::RuntimeConfig;
use rebalance_flow::logging;

mod commands;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init(cli.log_level.as_deref(), cli.json_logs);

    let config = RuntimeConfig::from_cli(&cli)?;
    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(commands::run(cli.command, config))
}
