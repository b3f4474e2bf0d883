//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Watch UPnP/IGD routers and inspect their configured entries.
#[derive(Parser, Debug)]
#[command(name = "igdwatch", version, about, arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "IGDWATCH_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect and validate the configuration file
    Config(ConfigArgs),

    /// Configured routers
    Entries(EntriesArgs),

    /// Print the local source address used to reach routers
    LocalIp,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Print the effective configuration as TOML
    Show,
    /// Validate the configuration
    Check,
}

#[derive(Args, Debug)]
pub struct EntriesArgs {
    #[command(subcommand)]
    pub command: EntriesCommand,
}

#[derive(Subcommand, Debug)]
pub enum EntriesCommand {
    /// List configured routers with their effective settings
    List {
        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
}
