//! Clap derive structures for the `ponwatch` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use ponwatch_config::DEFAULT_CONFIG_FILE;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ponwatch -- ONU inventory and optical metrics for a GPON OLT
#[derive(Debug, Parser)]
#[command(
    name = "ponwatch",
    version,
    about = "Poll a GPON OLT over SNMP and export ONU metrics",
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

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file
    #[arg(
        long,
        short = 'c',
        env = "PONWATCH_CONFIG_FILE",
        default_value = DEFAULT_CONFIG_FILE,
        global = true
    )]
    pub config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the periodic sweep and serve /metrics until interrupted
    Serve,

    /// List every ONU on a port (cached)
    Port(PortArgs),

    /// Full detail for one ONU
    Onu(OnuArgs),

    /// Unprovisioned ONU ids on a port
    FreeSlots {
        #[command(flatten)]
        port: PortArgs,

        /// Recompute from the device and overwrite the cache entry
        #[arg(long)]
        refresh: bool,
    },

    /// ONU ids with serial numbers on a port
    Serials(PortArgs),

    /// One page of a port listing
    Page {
        #[command(flatten)]
        port: PortArgs,

        /// 1-based page number
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,

        /// ONUs per page (capped at 100)
        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        size: i64,
    },

    /// Validate the configuration and exit
    CheckConfig,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct PortArgs {
    /// Line card number
    #[arg(long, short = 'b')]
    pub board: u32,

    /// PON port number on the card
    #[arg(long, short = 'p')]
    pub pon: u32,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct OnuArgs {
    #[command(flatten)]
    pub port: PortArgs,

    /// ONU id on the port
    #[arg(long, short = 'o')]
    pub onu_id: u32,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn page_accepts_out_of_range_values_for_clamping() {
        let cli = Cli::try_parse_from([
            "ponwatch", "page", "-b", "1", "-p", "2", "--page", "-3", "--size", "500",
        ])
        .map_err(|e| e.to_string());
        let Ok(Cli {
            command: Command::Page { port, page, size },
            ..
        }) = &cli
        else {
            panic!("unexpected parse result: {cli:?}");
        };
        assert_eq!((port.board, port.pon, *page, *size), (1, 2, -3, 500));
    }
}
