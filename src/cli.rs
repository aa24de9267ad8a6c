use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Portfolio rebalancer: detect wallet holdings, request a rebalance plan
/// from the planning backend and execute it as router swaps.
#[derive(Parser)]
#[command(name = "rebalance-flow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Network to operate on (sepolia or ethereum)
    #[arg(long, global = true, default_value = "sepolia")]
    pub network: String,

    /// Override the network's JSON-RPC endpoint (env: REBALANCE_RPC_URL)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Planning backend base URL (env: REBALANCE_BACKEND_URL)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Session file (default: ~/.rebalance-flow/session.json)
    #[arg(long, global = true)]
    pub session_file: Option<PathBuf>,

    /// Tolerance in percentage points for targets summing to 100
    #[arg(long, global = true, default_value = "0.01")]
    pub epsilon: f64,

    /// Skip plan actions at or below this amount
    #[arg(long, global = true, default_value = "0.0001")]
    pub dust: f64,

    /// Log level or filter directives (default: RUST_LOG, then info)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the wallet session, network and tracked tokens
    Status,

    /// Authorise the wallet account and detect holdings
    Connect,

    /// Forget the connected account
    Disconnect,

    /// Switch the wallet to the configured network, registering it if needed
    SwitchNetwork,

    /// Detect token balances and show the current allocation
    Detect,

    /// Track a custom ERC-20 token by contract address
    AddToken {
        /// Token contract address
        address: String,
    },

    /// Request a rebalance plan for the target allocation
    Plan {
        /// Targets as SYMBOL=PERCENT pairs, e.g. "ETH=50,TOKA=50"
        /// (default: last saved targets)
        #[arg(long, short = 't')]
        targets: Option<String>,
    },

    /// Plan and execute the swaps needed to reach the target allocation
    Execute {
        /// Targets as SYMBOL=PERCENT pairs (default: last saved targets)
        #[arg(long, short = 't')]
        targets: Option<String>,

        /// Check allowances and print the swaps without sending transactions
        #[arg(long)]
        dry_run: bool,
    },

    /// Set targets from a natural-language request, e.g. "half ETH, half TOKA"
    Query {
        /// The request text
        text: String,

        /// Also fetch a plan for the parsed targets
        #[arg(long)]
        plan: bool,
    },

    /// Ask the portfolio agent a question
    Ask {
        /// The question
        message: String,
    },
}
