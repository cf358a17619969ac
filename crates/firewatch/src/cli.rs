//! Clap derive structures for the `firewatch` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// firewatch -- live event relay for firewall dashboards
#[derive(Debug, Parser)]
#[command(
    name = "firewatch",
    version,
    about = "Live firewall event relay and traffic aggregation gateway",
    long_about = "Streams parsed firewall traffic events to dashboard clients over\n\
        WebSocket and proxies rule management and traffic statistics\n\
        to the firewall engine.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "FIREWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the gateway
    Serve(ServeArgs),

    /// Query the engine status once and print it
    Check,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (overrides server.listen)
    #[arg(long, short = 'l')]
    pub listen: Option<String>,

    /// Engine URL (overrides engine.url)
    #[arg(long, short = 'e')]
    pub engine_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the effective configuration (secrets masked)
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}
