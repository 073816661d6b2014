use std::fmt;

use serde::Serialize;

use crate::diagnosis::Diagnosis;
use crate::endpoint::{CONSENSUS_DEFAULT_PORT, EXECUTION_DEFAULT_PORT};
use crate::probe::ConnectivityResult;
use crate::scoring;

/// Which layer a node serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Consensus,
    Execution,
}

impl NodeKind {
    pub fn default_port(self) -> u16 {
        match self {
            NodeKind::Consensus => CONSENSUS_DEFAULT_PORT,
            NodeKind::Execution => EXECUTION_DEFAULT_PORT,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Consensus => write!(f, "consensus"),
            NodeKind::Execution => write!(f, "execution"),
        }
    }
}

/// Status of a single sub-check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "pass"),
            CheckStatus::Warn => write!(f, "warn"),
            CheckStatus::Fail => write!(f, "fail"),
            CheckStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Outcome of one protocol sub-check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    /// Points awarded towards the node score
    pub points: u8,
    pub detail: String,
    pub latency_ms: Option<f64>,
    /// Request attempts made (0 when skipped)
    pub attempts: usize,
}

impl SubCheck {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            points: 0,
            detail: String::new(),
            latency_ms: None,
            attempts: 0,
        }
    }

    pub fn pass(mut self, points: u8, detail: impl Into<String>) -> Self {
        self.status = CheckStatus::Pass;
        self.points = points;
        self.detail = detail.into();
        self
    }

    /// Degraded result that still earns `points`
    pub fn warn(mut self, points: u8, detail: impl Into<String>) -> Self {
        self.status = CheckStatus::Warn;
        self.points = points;
        self.detail = detail.into();
        self
    }

    pub fn fail(mut self, detail: impl Into<String>) -> Self {
        self.status = CheckStatus::Fail;
        self.points = 0;
        self.detail = detail.into();
        self
    }

    pub fn skipped(mut self, detail: impl Into<String>) -> Self {
        self.status = CheckStatus::Skipped;
        self.points = 0;
        self.detail = detail.into();
        self
    }

    pub fn with_latency(mut self, latency_ms: Option<f64>) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }
}

/// TCP probe series and its diagnosis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityReport {
    pub result: ConnectivityResult,
    pub diagnosis: Diagnosis,
}

/// Result of checking one node during one assessment cycle.
///
/// Built incrementally while sub-checks run. The score can only grow and
/// issues can only be appended, so both are private behind
/// [`NodeCheckResult::record`] and [`NodeCheckResult::add_issue`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCheckResult {
    pub kind: NodeKind,
    /// Endpoint as given by the operator
    pub endpoint: String,
    /// Resolved `host:port`, absent when the endpoint did not parse
    pub target: Option<String>,
    pub reachable: bool,
    pub healthy: bool,
    pub synced: bool,
    pub peer_count: Option<u64>,
    pub chain_id: Option<u64>,
    pub latest_block: Option<u64>,
    /// Slots (consensus) or blocks (execution) behind head while syncing
    pub sync_distance: Option<u64>,
    pub blob_sidecars: Option<usize>,
    pub latency_ms: Option<f64>,
    pub connectivity: Option<ConnectivityReport>,
    pub checks: Vec<SubCheck>,
    score: u8,
    issues: Vec<String>,
}

impl NodeCheckResult {
    pub fn new(kind: NodeKind, endpoint: impl Into<String>) -> Self {
        Self {
            kind,
            endpoint: endpoint.into(),
            target: None,
            reachable: false,
            healthy: false,
            synced: false,
            peer_count: None,
            chain_id: None,
            latest_block: None,
            sync_distance: None,
            blob_sidecars: None,
            latency_ms: None,
            connectivity: None,
            checks: Vec::new(),
            score: 0,
            issues: Vec::new(),
        }
    }

    /// Record a finished sub-check and add its points to the score
    pub fn record(&mut self, check: SubCheck) {
        self.score = scoring::accumulate(self.score, check.points);
        self.checks.push(check);
    }

    pub fn add_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn check(&self, name: &str) -> Option<&SubCheck> {
        self.checks.iter().find(|check| check.name == name)
    }

    /// Reachable, healthy and synced: the hard gates for readiness
    pub fn is_operational(&self) -> bool {
        self.reachable && self.healthy && self.synced
    }
}
