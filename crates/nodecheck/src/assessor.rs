//! Readiness assessment: combines both node results into one verdict.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::node::NodeCheckResult;
use crate::resources::ResourceSnapshot;

pub const EXCELLENT_THRESHOLD: f64 = 90.0;
pub const GOOD_THRESHOLD: f64 = 75.0;
pub const MARGINAL_THRESHOLD: f64 = 60.0;

/// Readiness verdict, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessTier {
    NotReady,
    Marginal,
    Good,
    Excellent,
}

impl ReadinessTier {
    /// Tier for `overall_score` when both nodes pass the operational gates.
    /// A pair failing the gates is never better than [`ReadinessTier::NotReady`].
    pub fn from_score(overall_score: f64, operational: bool) -> Self {
        if !operational {
            return Self::NotReady;
        }
        match overall_score {
            score if score >= EXCELLENT_THRESHOLD => Self::Excellent,
            score if score >= GOOD_THRESHOLD => Self::Good,
            score if score >= MARGINAL_THRESHOLD => Self::Marginal,
            _ => Self::NotReady,
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, Self::Excellent | Self::Good)
    }
}

impl fmt::Display for ReadinessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessTier::NotReady => write!(f, "NOT_READY"),
            ReadinessTier::Marginal => write!(f, "MARGINAL"),
            ReadinessTier::Good => write!(f, "GOOD"),
            ReadinessTier::Excellent => write!(f, "EXCELLENT"),
        }
    }
}

/// Final result of one assessment cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentResult {
    pub consensus: NodeCheckResult,
    pub execution: NodeCheckResult,
    pub overall_score: f64,
    pub tier: ReadinessTier,
    pub ready: bool,
    /// Issues of both nodes, deduplicated in first-seen order
    pub issues: Vec<String>,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSnapshot>,
}

impl AssessmentResult {
    pub fn with_resources(mut self, resources: Option<ResourceSnapshot>) -> Self {
        self.resources = resources;
        self
    }

    /// Process exit status: 0 when ready, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.ready { 0 } else { 1 }
    }
}

/// Combine the two node results into a verdict
pub fn assess(consensus: NodeCheckResult, execution: NodeCheckResult) -> AssessmentResult {
    let overall_score = (f64::from(consensus.score()) + f64::from(execution.score())) / 2.0;
    let operational = consensus.is_operational() && execution.is_operational();
    let tier = ReadinessTier::from_score(overall_score, operational);

    let mut issues: Vec<String> = Vec::new();
    for node in [&consensus, &execution] {
        for issue in node.issues() {
            let issue = format!("{}: {issue}", node.kind);
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
    }

    tracing::info!(overall_score, %tier, issues = issues.len(), "Assessment complete");

    AssessmentResult {
        consensus,
        execution,
        overall_score,
        tier,
        ready: tier.is_ready(),
        issues,
        checked_at: Utc::now(),
        resources: None,
    }
}
