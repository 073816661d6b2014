use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{ProtocolChecker, parse_quantity, record_latency, record_peers};
use crate::SEPOLIA_CHAIN_ID;
use crate::node::{NodeCheckResult, NodeKind, SubCheck};
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::scoring;
use crate::transport::{HttpTransport, TransportError};

/// Chain id of Ethereum mainnet, called out explicitly in mismatch issues
const MAINNET_CHAIN_ID: u64 = 1;

/// What the execution node is expected to look like
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkExpectations {
    pub chain_id: u64,
    /// Block heights at or below this are treated as a stale or zeroed chain
    pub min_block: u64,
    /// Blocks behind head tolerated while syncing before it is flagged
    pub max_blocks_behind: u64,
}

impl Default for NetworkExpectations {
    fn default() -> Self {
        Self { chain_id: SEPOLIA_CHAIN_ID, min_block: 1_000, max_blocks_behind: 1_000 }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_result(self) -> Result<Value, TransportError> {
        if let Some(error) = self.error {
            return Err(TransportError::Rpc { code: error.code, message: error.message });
        }
        self.result.ok_or_else(|| TransportError::Body("response has no result".to_string()))
    }
}

/// Execution node checker (Ethereum JSON-RPC)
pub struct ExecutionChecker {
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
    expectations: NetworkExpectations,
}

impl ExecutionChecker {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        retry: RetryPolicy,
        expectations: NetworkExpectations,
    ) -> Self {
        Self { transport, retry, expectations }
    }

    /// JSON-RPC call with no params. A well-formed result marks the node healthy.
    async fn call(&self, url: &str, method: &str, result: &mut NodeCheckResult) -> RetryOutcome<Value> {
        let request = json!({ "jsonrpc": "2.0", "method": method, "params": [], "id": 1 });
        let transport = self.transport.as_ref();
        let request = &request;

        let outcome = self
            .retry
            .run(move |_| async move {
                let reply = transport.post_json(url, request).await?;
                reply.decode::<RpcResponse>()?.into_result()
            })
            .await;

        if outcome.value.is_some() {
            result.healthy = true;
        }
        outcome
    }

    fn record_failure(result: &mut NodeCheckResult, name: &'static str, method: &str, outcome: &RetryOutcome<Value>) {
        let summary = outcome.failure_summary();
        warn!(method, "RPC call {summary}");
        result.add_issue(format!("{method} {summary}"));
        result.record(SubCheck::new(name).with_attempts(outcome.attempts.len()).fail(summary));
    }

    async fn check_chain_id(&self, url: &str, result: &mut NodeCheckResult) {
        let outcome = self.call(url, "eth_chainId", result).await;
        let Some(value) = outcome.value.as_ref() else {
            return Self::record_failure(result, "chain_id", "eth_chainId", &outcome);
        };

        let check = SubCheck::new("chain_id").with_attempts(outcome.attempts.len());
        let expected = self.expectations.chain_id;

        let check = match parse_quantity(value) {
            Some(chain_id) if chain_id == expected => {
                info!(chain_id, "Confirmed expected network");
                result.chain_id = Some(chain_id);
                check.pass(scoring::EXECUTION_CHAIN_ID, format!("chain id {chain_id}"))
            }
            Some(chain_id) => {
                warn!(chain_id, expected, "Unexpected chain id");
                result.chain_id = Some(chain_id);
                let issue = if chain_id == MAINNET_CHAIN_ID {
                    format!("wrong network: connected to mainnet (chain id {chain_id}, expected {expected})")
                } else {
                    format!("unexpected chain id {chain_id} (expected {expected})")
                };
                result.add_issue(issue.clone());
                check.warn(scoring::EXECUTION_CHAIN_ID_MISMATCH, issue)
            }
            None => {
                result.add_issue(format!("unparsable eth_chainId result: {value}"));
                check.fail(format!("unparsable result {value}"))
            }
        };
        result.record(check);
    }

    async fn check_sync(&self, url: &str, result: &mut NodeCheckResult) {
        let outcome = self.call(url, "eth_syncing", result).await;
        let Some(value) = outcome.value.as_ref() else {
            return Self::record_failure(result, "sync", "eth_syncing", &outcome);
        };

        let check = SubCheck::new("sync").with_attempts(outcome.attempts.len());
        let check = match value {
            Value::Bool(false) => {
                info!("Execution node is synced");
                result.synced = true;
                check.pass(scoring::EXECUTION_SYNCED, "synced")
            }
            Value::Object(progress) => {
                let current = progress.get("currentBlock").and_then(parse_quantity);
                let highest = progress.get("highestBlock").and_then(parse_quantity);
                self.score_sync_progress(result, check, current, highest)
            }
            // Some clients answer `true` without progress details
            Value::Bool(true) => self.score_sync_progress(result, check, None, None),
            other => {
                result.add_issue(format!("unrecognised eth_syncing result: {other}"));
                check.fail(format!("unrecognised result {other}"))
            }
        };
        result.record(check);
    }

    fn score_sync_progress(
        &self,
        result: &mut NodeCheckResult,
        check: SubCheck,
        current: Option<u64>,
        highest: Option<u64>,
    ) -> SubCheck {
        let (Some(current), Some(highest)) = (current, highest) else {
            warn!("Execution node is syncing, progress unknown");
            result.add_issue("still syncing (progress unknown)");
            return check.fail("syncing, progress unknown");
        };

        let behind = highest.saturating_sub(current);
        let limit = self.expectations.max_blocks_behind;
        warn!(current, highest, behind, "Execution node is syncing");
        result.sync_distance = Some(behind);
        result.add_issue(format!("still syncing ({behind} blocks behind)"));

        if behind > limit {
            result.add_issue(format!("far behind chain head ({behind} blocks, limit {limit})"));
            check.warn(scoring::EXECUTION_SYNCING_FAR_BEHIND, format!("syncing, {behind} blocks behind"))
        } else {
            check.warn(scoring::EXECUTION_SYNCING_NEAR_HEAD, format!("syncing, {behind} blocks behind"))
        }
    }

    async fn check_block_number(&self, url: &str, result: &mut NodeCheckResult) {
        let outcome = self.call(url, "eth_blockNumber", result).await;
        let Some(value) = outcome.value.as_ref() else {
            return Self::record_failure(result, "block_number", "eth_blockNumber", &outcome);
        };

        let check = SubCheck::new("block_number")
            .with_attempts(outcome.attempts.len())
            .with_latency(outcome.latency_ms());
        let floor = self.expectations.min_block;

        let check = match parse_quantity(value) {
            Some(block) => {
                result.latest_block = Some(block);
                if block > floor {
                    info!(block, "Latest block");
                    check.pass(scoring::EXECUTION_BLOCK_HEIGHT, format!("block {block}"))
                } else {
                    result.add_issue(format!("latest block {block} is below plausibility floor {floor}"));
                    check.fail(format!("block {block} <= {floor}"))
                }
            }
            None => {
                result.add_issue(format!("unparsable eth_blockNumber result: {value}"));
                check.fail(format!("unparsable result {value}"))
            }
        };
        result.record(check);
    }

    async fn check_peers(&self, url: &str, result: &mut NodeCheckResult) {
        let outcome = self.call(url, "net_peerCount", result).await;
        let Some(value) = outcome.value.as_ref() else {
            return Self::record_failure(result, "peers", "net_peerCount", &outcome);
        };

        match parse_quantity(value) {
            Some(peers) => {
                info!(peers, "Execution peer count");
                record_peers(result, peers, outcome.attempts.len());
            }
            None => {
                result.add_issue(format!("unparsable net_peerCount result: {value}"));
                result.record(
                    SubCheck::new("peers")
                        .with_attempts(outcome.attempts.len())
                        .fail(format!("unparsable result {value}")),
                );
            }
        }
    }

    async fn check_latency(&self, url: &str, result: &mut NodeCheckResult) {
        let outcome = self.call(url, "eth_blockNumber", result).await;
        record_latency(result, &outcome);
    }
}

#[async_trait::async_trait]
impl ProtocolChecker for ExecutionChecker {
    fn kind(&self) -> NodeKind {
        NodeKind::Execution
    }

    async fn check(&self, base_url: &str, result: &mut NodeCheckResult) {
        self.check_chain_id(base_url, result).await;
        self.check_sync(base_url, result).await;
        self.check_block_number(base_url, result).await;
        self.check_peers(base_url, result).await;
        self.check_latency(base_url, result).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpReply;
    use crate::transport::testing::ScriptedTransport;
    use std::time::Duration;

    const RPC: &str = "http://geth:8545";

    fn healthy_rpc(chain_id: &str) -> ScriptedTransport {
        ScriptedTransport::new()
            .rpc_result("eth_chainId", json!(chain_id))
            .rpc_result("eth_syncing", json!(false))
            .rpc_result("eth_blockNumber", json!("0x8a3f12"))
            .rpc_result("net_peerCount", json!("0x32"))
    }

    async fn run(transport: ScriptedTransport) -> NodeCheckResult {
        let checker = ExecutionChecker::new(
            Arc::new(transport),
            RetryPolicy::new(2, Duration::ZERO),
            NetworkExpectations::default(),
        );
        let mut result = NodeCheckResult::new(NodeKind::Execution, RPC);
        result.reachable = true;
        checker.check(RPC, &mut result).await;
        result
    }

    #[tokio::test]
    async fn test_fully_healthy_node_scores_max() {
        let result = run(healthy_rpc("0xaa36a7")).await;

        assert!(result.healthy);
        assert!(result.synced);
        assert_eq!(result.chain_id, Some(SEPOLIA_CHAIN_ID));
        assert_eq!(result.latest_block, Some(0x8a3f12));
        assert_eq!(result.peer_count, Some(50));
        assert_eq!(result.score(), 100);
        assert!(result.issues().is_empty(), "{:?}", result.issues());
    }

    #[tokio::test]
    async fn test_chain_id_mismatch_is_partial() {
        let result = run(healthy_rpc("0x5")).await;

        assert_eq!(result.chain_id, Some(5));
        assert_eq!(result.check("chain_id").unwrap().points, scoring::EXECUTION_CHAIN_ID_MISMATCH);
        assert_eq!(result.score(), 100 - scoring::EXECUTION_CHAIN_ID + scoring::EXECUTION_CHAIN_ID_MISMATCH);
        assert!(result.issues().iter().any(|issue| issue.contains("5")));
    }

    #[tokio::test]
    async fn test_mainnet_is_called_out() {
        let result = run(healthy_rpc("0x1")).await;
        assert!(result.issues()[0].contains("mainnet"));
    }

    #[tokio::test]
    async fn test_unparsable_chain_id_scores_zero() {
        let transport = ScriptedTransport::new()
            .rpc_result("eth_chainId", json!("sepolia"))
            .rpc_result("eth_syncing", json!(false))
            .rpc_result("eth_blockNumber", json!("0x8a3f12"))
            .rpc_result("net_peerCount", json!("0x32"));
        let result = run(transport).await;

        assert_eq!(result.chain_id, None);
        assert_eq!(result.check("chain_id").unwrap().points, 0);
        assert_eq!(result.score(), 80);
    }

    #[tokio::test]
    async fn test_syncing_far_behind() {
        let transport = ScriptedTransport::new()
            .rpc_result("eth_chainId", json!("0xaa36a7"))
            .rpc_result("eth_syncing", json!({ "currentBlock": "0x100", "highestBlock": "0x1000" }))
            .rpc_result("eth_blockNumber", json!("0x100000"))
            .rpc_result("net_peerCount", json!("0x32"));
        let result = run(transport).await;

        assert!(!result.synced);
        assert_eq!(result.sync_distance, Some(0x1000 - 0x100));
        assert_eq!(result.check("sync").unwrap().points, scoring::EXECUTION_SYNCING_FAR_BEHIND);
        assert!(result.issues().iter().any(|issue| issue.starts_with("still syncing")));
        assert!(result.issues().iter().any(|issue| issue.starts_with("far behind chain head")));
    }

    #[tokio::test]
    async fn test_syncing_near_head() {
        let transport = ScriptedTransport::new()
            .rpc_result("eth_chainId", json!("0xaa36a7"))
            .rpc_result("eth_syncing", json!({ "currentBlock": "0x8a3f00", "highestBlock": "0x8a3f12" }))
            .rpc_result("eth_blockNumber", json!("0x8a3f00"))
            .rpc_result("net_peerCount", json!("0x32"));
        let result = run(transport).await;

        assert_eq!(result.check("sync").unwrap().points, scoring::EXECUTION_SYNCING_NEAR_HEAD);
        assert!(!result.issues().iter().any(|issue| issue.starts_with("far behind")));
    }

    #[tokio::test]
    async fn test_rpc_error_does_not_abort_other_checks() {
        let error = json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": -32601, "message": "method not found" } });
        let transport = ScriptedTransport::new()
            .rpc_result("eth_chainId", json!("0xaa36a7"))
            .rpc_result("eth_syncing", json!(false))
            .rpc_result("eth_blockNumber", json!("0x8a3f12"))
            .on_rpc("net_peerCount", Ok(HttpReply::new(200, error.to_string())));
        let result = run(transport).await;

        assert_eq!(result.peer_count, None);
        assert_eq!(result.score(), 75);
        assert!(result.issues()[0].contains("method not found"));
    }

    #[tokio::test]
    async fn test_stale_chain_below_floor() {
        let transport = ScriptedTransport::new()
            .rpc_result("eth_chainId", json!("0xaa36a7"))
            .rpc_result("eth_syncing", json!(false))
            .rpc_result("eth_blockNumber", json!("0x0"))
            .rpc_result("net_peerCount", json!("0x32"));
        let result = run(transport).await;

        assert_eq!(result.latest_block, Some(0));
        assert_eq!(result.score(), 90);
        assert!(result.issues()[0].contains("plausibility floor"));
    }

    #[tokio::test]
    async fn test_unreachable_rpc_is_unhealthy() {
        let transport = ScriptedTransport::new();
        let result = run(transport).await;

        assert!(!result.healthy);
        assert_eq!(result.score(), 0);
        assert_eq!(result.checks.len(), 5);
        assert_eq!(result.issues().len(), 5);
    }
}
