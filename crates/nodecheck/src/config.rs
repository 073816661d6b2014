use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};

use crate::checker::NetworkExpectations;
use crate::error::{NodeCheckError, Result};
use crate::probe::DEFAULT_CONNECT_PAUSE;
use crate::retry::{DEFAULT_RETRY_DELAY, RetryPolicy};

const MIN_TIMEOUT: u64 = 1;
const MAX_TIMEOUT: u64 = 300; // 5 minutes
const MIN_RETRIES: u32 = 1;
const MAX_RETRIES: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoints: Endpoints,
    pub probe: ProbeSettings,
    pub network: NetworkExpectations,
    pub monitor: MonitorSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Consensus (beacon) node HTTP API base URL
    pub consensus: String,
    /// Execution node JSON-RPC URL
    pub execution: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            consensus: "http://localhost:5052".into(),
            execution: "http://localhost:8545".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Per-attempt timeout for TCP connects and HTTP requests
    pub timeout_seconds: u64,
    /// Attempts per TCP probe series and per request
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub connect_pause_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            retries: 3,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            connect_pause_ms: DEFAULT_CONNECT_PAUSE.as_millis() as u64,
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_pause(&self) -> Duration {
        Duration::from_millis(self.connect_pause_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_millis(self.retry_delay_ms))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Re-run the assessment every N seconds; single run when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
}

impl MonitorSettings {
    pub fn interval(&self) -> Option<Duration> {
        self.interval_seconds.map(Duration::from_secs)
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/nodecheck/config.toml or
/// $HOME/.config/...)
pub fn default_config_path() -> Result<path::PathBuf> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(NodeCheckError::ConfigPathUnavailable);
    };

    Ok(path.join("nodecheck/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Configuration:")?;
        write_title_1(f, "Endpoints")?;
        write_1(f, "Consensus", &self.endpoints.consensus)?;
        write_1(f, "Execution", &self.endpoints.execution)?;
        write_title_1(f, "Probe")?;
        write_1(f, "Timeout (s)", &self.probe.timeout_seconds)?;
        write_1(f, "Retries", &self.probe.retries)?;
        write_1(f, "Retry Delay (ms)", &self.probe.retry_delay_ms)?;
        write_1(f, "Connect Pause (ms)", &self.probe.connect_pause_ms)?;
        write_title_1(f, "Network")?;
        write_1(f, "Chain ID", &self.network.chain_id)?;
        write_1(f, "Min Block", &self.network.min_block)?;
        write_1(f, "Max Blocks Behind", &self.network.max_blocks_behind)?;
        write_title_1(f, "Monitor")?;
        match self.monitor.interval_seconds {
            Some(seconds) => write_1(f, "Interval (s)", &seconds)?,
            None => write_1(f, "Interval (s)", &"disabled")?,
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from `optional_path`, or from the default location.
    ///
    /// A missing file yields the defaults; nothing is written.
    ///
    /// ```no_run
    /// let cfg = nodecheck::Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), nodecheck::NodeCheckError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self> {
        let config_path = Self::resolve_path(optional_path)?;

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| NodeCheckError::ConfigRead { path: config_path.clone(), source })?;
            toml::from_str(raw_string.as_str())
                .map_err(|source| NodeCheckError::ConfigParse { path: config_path, source })
        } else {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Explicit path (with `.toml` enforced) or the default location
    pub fn resolve_path(optional_path: Option<impl AsRef<path::Path>>) -> Result<path::PathBuf> {
        match optional_path {
            Some(path) => Ok(normalize_toml_path(path.as_ref())),
            None => default_config_path(),
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| NodeCheckError::ConfigWrite { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| NodeCheckError::ConfigWrite { path: path.to_path_buf(), source })
    }

    /// Reject values that would make the checks meaningless
    pub fn validate(&self) -> Result<()> {
        let timeout = self.probe.timeout_seconds;
        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&timeout) {
            return Err(NodeCheckError::InvalidConfig(format!(
                "timeout {timeout}s out of range ({MIN_TIMEOUT}-{MAX_TIMEOUT}s)"
            )));
        }

        let retries = self.probe.retries;
        if !(MIN_RETRIES..=MAX_RETRIES).contains(&retries) {
            return Err(NodeCheckError::InvalidConfig(format!(
                "retries {retries} out of range ({MIN_RETRIES}-{MAX_RETRIES})"
            )));
        }

        if self.monitor.interval_seconds == Some(0) {
            return Err(NodeCheckError::InvalidConfig(
                "monitor interval must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}
