//! Command-line interface definitions

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "price-proxy")]
#[command(about = "Multi-source token price aggregation", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Log filter override, e.g. `debug` or `pricing_feed=trace`
    #[arg(short, long, env = "LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Per-source timeout in milliseconds, overriding the environment
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a token price from every eligible source
    Price {
        /// Token address (0x-hex for EVM chains, base58 for Solana)
        token: String,

        /// Chain id; 1399811149 selects Solana
        chain: String,

        /// Unix timestamp in seconds for a historical lookup
        #[arg(short, long)]
        timestamp: Option<i64>,

        /// Historical search window, e.g. `4h`
        #[arg(long, requires = "timestamp")]
        search_width: Option<String>,
    },

    /// Probe every upstream with a well-known token
    Health {
        /// Restrict the probe to one chain family
        #[arg(short, long, value_enum)]
        family: Option<Family>,
    },

    /// List the chains each service supports
    Chains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Family {
    Evm,
    Svm,
}
