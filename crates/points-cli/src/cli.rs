use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "points",
    about = "Points ledger: per-user balances with serialized charge and use",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Run a concurrent charge/use workload against an in-memory ledger
    Simulate(SimulateArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the bind address
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of distinct users
    #[arg(long, default_value = "5")]
    pub users: u64,
    /// Number of concurrent operations
    #[arg(long, default_value = "200")]
    pub ops: usize,
    /// Points charged to every user before the workload starts
    #[arg(long, default_value = "1000")]
    pub initial: i64,
    /// Simulated store latency per call, in milliseconds
    #[arg(long, default_value = "1")]
    pub latency_ms: u64,
    /// Bound on each operation's lock wait, in milliseconds
    #[arg(long)]
    pub lock_timeout_ms: Option<u64>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
