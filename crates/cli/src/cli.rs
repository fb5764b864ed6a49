//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Route Sync - multi-robot route synchronization
#[derive(Parser, Debug)]
#[command(
    name = "route-sync",
    author,
    version,
    about = "Multi-robot route synchronization pipeline",
    long_about = "Releases each robot's planned route incrementally, only as far as the \n\
                  cross-robot precedence constraints allow.\n\n\
                  Replays recorded plans and positions, runs the synchronization engine \n\
                  and publishes synchronized paths to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ROUTE_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "ROUTE_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scenario through the synchronization pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to fleet configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "fleet.toml",
        env = "ROUTE_SYNC_CONFIG"
    )]
    pub config: PathBuf,

    /// Scenario to replay (JSON Lines of plan and position records)
    #[arg(short, long, env = "ROUTE_SYNC_SCENARIO")]
    pub scenario: PathBuf,

    /// Replay speed multiplier (0 = as fast as possible)
    #[arg(long, default_value = "1.0", env = "ROUTE_SYNC_SPEED")]
    pub speed: f64,

    /// Stop after this many handled events (0 = unlimited)
    #[arg(long, default_value = "0", env = "ROUTE_SYNC_MAX_EVENTS")]
    pub max_events: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "ROUTE_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and scenario, then exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for internal queues
    #[arg(long, default_value = "1024", env = "ROUTE_SYNC_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// What the replay source does when the event queue is full
    #[arg(long, value_enum, default_value = "block", env = "ROUTE_SYNC_DROP_POLICY")]
    pub drop_policy: DropPolicyArg,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "ROUTE_SYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "fleet.toml", env = "ROUTE_SYNC_CONFIG")]
    pub config: PathBuf,

    /// Also parse a scenario against the configured roster
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "fleet.toml", env = "ROUTE_SYNC_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

/// Queue-full behaviour of the replay source
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DropPolicyArg {
    /// Wait for room, never lose an event
    #[default]
    Block,
    /// Drop position samples that do not fit
    DropPositions,
}

impl From<DropPolicyArg> for ingestion::DropPolicy {
    fn from(arg: DropPolicyArg) -> Self {
        match arg {
            DropPolicyArg::Block => ingestion::DropPolicy::Block,
            DropPolicyArg::DropPositions => ingestion::DropPolicy::DropNewestPosition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_args() {
        let cli = Cli::try_parse_from([
            "route-sync",
            "-v",
            "run",
            "--config",
            "fleet.toml",
            "--scenario",
            "demo.jsonl",
            "--speed",
            "0",
            "--drop-policy",
            "drop-positions",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.scenario, PathBuf::from("demo.jsonl"));
        assert_eq!(args.speed, 0.0);
        assert_eq!(
            ingestion::DropPolicy::from(args.drop_policy),
            ingestion::DropPolicy::DropNewestPosition
        );
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["route-sync", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
