use std::path::PathBuf;

use clap::{ArgAction, Parser};
use logger::LevelFilter;
use nodecheck::Config;

/// Assess whether a consensus + execution node pair is ready to run a validator
#[derive(Debug, Parser)]
#[command(name = "check-nodes", version)]
pub struct Cli {
    /// Consensus (beacon) node HTTP API URL
    #[arg(long, value_name = "URL", env = "NODECHECK_BEACON_URL")]
    pub beacon: Option<String>,

    /// Execution node JSON-RPC URL
    #[arg(long, alias = "sepolia", value_name = "URL", env = "NODECHECK_EXECUTION_URL")]
    pub execution: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Attempts per connectivity probe and per request
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Re-run the assessment every SECS seconds until interrupted
    #[arg(long, value_name = "SECS")]
    pub monitor: Option<u64>,

    /// Expected execution chain id
    #[arg(long, value_name = "ID")]
    pub chain_id: Option<u64>,

    /// Config file (defaults to $XDG_CONFIG_HOME/nodecheck/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    pub init_config: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Skip the host load and memory check
    #[arg(long)]
    pub no_system_check: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Override config file values with the flags given on the command line
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(beacon) = &self.beacon {
            config.endpoints.consensus.clone_from(beacon);
        }
        if let Some(execution) = &self.execution {
            config.endpoints.execution.clone_from(execution);
        }
        if let Some(timeout) = self.timeout {
            config.probe.timeout_seconds = timeout;
        }
        if let Some(retries) = self.retries {
            config.probe.retries = retries;
        }
        if let Some(interval) = self.monitor {
            config.monitor.interval_seconds = Some(interval);
        }
        if let Some(chain_id) = self.chain_id {
            config.network.chain_id = chain_id;
        }
        config
    }

    pub fn log_level(&self) -> LevelFilter {
        logger::level_for_verbosity(self.verbose)
    }
}
