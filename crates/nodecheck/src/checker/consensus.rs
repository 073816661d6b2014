use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{ProtocolChecker, fetch_json, parse_quantity, record_latency, record_peers};
use crate::node::{NodeCheckResult, NodeKind, SubCheck};
use crate::retry::RetryPolicy;
use crate::scoring;
use crate::transport::{HttpTransport, TransportError};

pub const HEALTH_PATH: &str = "/eth/v1/node/health";
pub const SYNCING_PATH: &str = "/eth/v1/node/syncing";
pub const PEERS_PATH: &str = "/eth/v1/node/peers";
pub const HEAD_HEADER_PATH: &str = "/eth/v1/beacon/headers/head";
pub const BLOB_SIDECARS_PATH: &str = "/eth/v1/beacon/blob_sidecars/head";

/// Checks run after health, in order; skipped when health fails
const DEPENDENT_CHECKS: [&str; 4] = ["sync", "peers", "latency", "blob_sidecars"];

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct SyncingData {
    is_syncing: Option<bool>,
    sync_distance: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PeerEntry {
    state: Option<String>,
}

/// Beacon node checker (standard beacon node HTTP API)
pub struct ConsensusChecker {
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
}

impl ConsensusChecker {
    pub fn new(transport: Arc<dyn HttpTransport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Health endpoint; returns false when the node cannot be checked further
    async fn check_health(&self, base_url: &str, result: &mut NodeCheckResult) -> bool {
        let url = format!("{base_url}{HEALTH_PATH}");
        let transport = self.transport.as_ref();
        let url_ref = url.as_str();

        // Body is empty; 200 (ready) and 206 (syncing) both count as healthy
        let outcome = self
            .retry
            .run(move |_| async move {
                let reply = transport.get(url_ref).await?;
                if reply.is_success() { Ok(reply.status) } else { Err(TransportError::Status(reply.status)) }
            })
            .await;

        let check = SubCheck::new("health")
            .with_attempts(outcome.attempts.len())
            .with_latency(outcome.latency_ms());

        match outcome.value {
            Some(status) => {
                info!(status, "Beacon node is healthy");
                result.healthy = true;
                result.record(check.pass(scoring::CONSENSUS_HEALTH, format!("HTTP {status}")));
                true
            }
            None => {
                let summary = outcome.failure_summary();
                warn!(%url, "Beacon health check {summary}");
                result.add_issue(format!("health endpoint {summary}"));
                result.record(check.fail(summary));
                false
            }
        }
    }

    async fn check_sync(&self, base_url: &str, result: &mut NodeCheckResult) {
        let url = format!("{base_url}{SYNCING_PATH}");
        let outcome = fetch_json::<Envelope<SyncingData>>(self.transport.as_ref(), &self.retry, &url).await;
        let check = SubCheck::new("sync").with_attempts(outcome.attempts.len());

        let Some(Envelope { data }) = outcome.value.as_ref() else {
            result.add_issue(format!("sync status {}", outcome.failure_summary()));
            result.record(check.fail(outcome.failure_summary()));
            return;
        };

        let distance = data.sync_distance.as_ref().and_then(parse_quantity);
        match data.is_syncing {
            Some(false) => {
                info!("Beacon node is synced");
                result.synced = true;
                result.record(check.pass(scoring::CONSENSUS_SYNCED, "synced"));
            }
            Some(true) => {
                warn!(?distance, "Beacon node is syncing");
                result.sync_distance = distance;
                let issue = match distance {
                    Some(distance) => format!("still syncing (sync distance {distance})"),
                    None => "still syncing".to_string(),
                };
                result.add_issue(issue.clone());
                result.record(check.warn(scoring::CONSENSUS_SYNCING, issue));
            }
            None => {
                result.add_issue("sync status unknown (missing is_syncing)");
                result.record(check.fail("missing is_syncing"));
            }
        }
    }

    async fn check_peers(&self, base_url: &str, result: &mut NodeCheckResult) {
        let url = format!("{base_url}{PEERS_PATH}");
        let outcome = fetch_json::<Envelope<Vec<PeerEntry>>>(self.transport.as_ref(), &self.retry, &url).await;

        match outcome.value.as_ref() {
            Some(Envelope { data }) => {
                let connected = data
                    .iter()
                    .filter(|peer| peer.state.as_deref().is_none_or(|state| state == "connected"))
                    .count() as u64;
                info!(peers = connected, "Beacon peer count");
                record_peers(result, connected, outcome.attempts.len());
            }
            None => {
                result.add_issue(format!("peer count {}", outcome.failure_summary()));
                result.record(
                    SubCheck::new("peers")
                        .with_attempts(outcome.attempts.len())
                        .fail(outcome.failure_summary()),
                );
            }
        }
    }

    async fn check_latency(&self, base_url: &str, result: &mut NodeCheckResult) {
        let url = format!("{base_url}{HEAD_HEADER_PATH}");
        let outcome = fetch_json::<Value>(self.transport.as_ref(), &self.retry, &url).await;
        record_latency(result, &outcome);
    }

    /// Informational only: blob sidecars at head. Never scored, never an issue.
    async fn check_blob_sidecars(&self, base_url: &str, result: &mut NodeCheckResult) {
        let url = format!("{base_url}{BLOB_SIDECARS_PATH}");
        let outcome = fetch_json::<Envelope<Vec<Value>>>(self.transport.as_ref(), &self.retry, &url).await;
        let check = SubCheck::new("blob_sidecars").with_attempts(outcome.attempts.len());

        match outcome.value.as_ref() {
            Some(Envelope { data }) => {
                result.blob_sidecars = Some(data.len());
                result.record(check.pass(0, format!("{} sidecars at head", data.len())));
            }
            None => result.record(check.skipped(format!("unavailable: {}", outcome.failure_summary()))),
        }
    }
}

#[async_trait::async_trait]
impl ProtocolChecker for ConsensusChecker {
    fn kind(&self) -> NodeKind {
        NodeKind::Consensus
    }

    async fn check(&self, base_url: &str, result: &mut NodeCheckResult) {
        if !self.check_health(base_url, result).await {
            for name in DEPENDENT_CHECKS {
                result.record(SubCheck::new(name).skipped("health check failed"));
            }
            return;
        }

        self.check_sync(base_url, result).await;
        self.check_peers(base_url, result).await;
        self.check_latency(base_url, result).await;
        self.check_blob_sidecars(base_url, result).await;
    }
}
