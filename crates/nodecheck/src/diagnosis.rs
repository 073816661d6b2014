//! Connectivity diagnosis.
//!
//! Maps the raw statistics of a [`ConnectivityResult`] onto a qualitative
//! category plus remediation hints an operator can act on.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::probe::ConnectivityResult;

/// Mean latency above which a fully reachable endpoint is flagged as slow
pub const HIGH_LATENCY_MS: f64 = 1000.0;

/// Failed attempts averaging at least this share of the timeout are treated
/// as timeouts rather than refusals
const TIMEOUT_SHARE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityStatus {
    Critical,
    Error,
    WarningIntermittent,
    WarningLatency,
    Stable,
}

impl ConnectivityStatus {
    /// Whether protocol checks must be skipped for the node
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Critical | Self::Error)
    }

    pub fn is_warning(self) -> bool {
        matches!(self, Self::WarningIntermittent | Self::WarningLatency)
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityStatus::Critical => write!(f, "critical"),
            ConnectivityStatus::Error => write!(f, "error"),
            ConnectivityStatus::WarningIntermittent => write!(f, "intermittent"),
            ConnectivityStatus::WarningLatency => write!(f, "high latency"),
            ConnectivityStatus::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub status: ConnectivityStatus,
    pub summary: String,
    pub details: Vec<String>,
    pub remediation: Vec<String>,
}

/// Classify a series of connection attempts made with `timeout` against `port`.
pub fn classify(result: &ConnectivityResult, timeout: Duration, port: u16) -> Diagnosis {
    let timeout_ms = timeout.as_secs_f64() * 1000.0;

    if !result.any_success() {
        let mean_attempt = result.mean_attempt_latency_ms().unwrap_or_default();

        if mean_attempt >= timeout_ms * TIMEOUT_SHARE {
            return Diagnosis {
                status: ConnectivityStatus::Critical,
                summary: "Connection timeout - service likely not running or severely overloaded"
                    .to_string(),
                details: vec![format!(
                    "Average attempt time: {mean_attempt:.0}ms (limit: {timeout_ms:.0}ms)"
                )],
                remediation: vec![
                    "Check: sudo systemctl status <service-name>".to_string(),
                    format!("Check: sudo ss -tlnp | grep {port}"),
                ],
            };
        }

        return Diagnosis {
            status: ConnectivityStatus::Error,
            summary: "Port closed or service not responding".to_string(),
            details: vec![format!("Connection refused after {mean_attempt:.0}ms")],
            remediation: vec![
                format!("Check: sudo ufw status (firewall on port {port})"),
                "Check: service configuration and binding address".to_string(),
            ],
        };
    }

    let success_rate = result.success_rate();
    let mean_latency = result.mean_latency_ms().unwrap_or_default();

    if success_rate < 1.0 {
        return Diagnosis {
            status: ConnectivityStatus::WarningIntermittent,
            summary: format!("Intermittent connectivity ({:.0}% success rate)", success_rate * 100.0),
            details: vec![format!("Average latency: {mean_latency:.0}ms")],
            remediation: vec!["Check: network stability and system load".to_string()],
        };
    }

    if mean_latency > HIGH_LATENCY_MS {
        return Diagnosis {
            status: ConnectivityStatus::WarningLatency,
            summary: format!("High connection latency ({mean_latency:.0}ms)"),
            details: vec![format!("Average response time: {mean_latency:.0}ms")],
            remediation: vec!["Consider: hardware or network capacity upgrade".to_string()],
        };
    }

    Diagnosis {
        status: ConnectivityStatus::Stable,
        summary: format!("Connection stable (latency: {mean_latency:.0}ms)"),
        details: Vec::new(),
        remediation: Vec::new(),
    }
}
