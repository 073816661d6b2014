//! Protocol checkers - run the node-specific sub-checks
//!
//! Every sub-check goes through the shared [`RetryPolicy`], records a
//! [`SubCheck`] on the node result and adds its points. A failing sub-check
//! contributes nothing and appends an issue; only a failed consensus health
//! check stops the remaining checks of that node.

pub mod consensus;
pub mod execution;

pub use consensus::ConsensusChecker;
pub use execution::{ExecutionChecker, NetworkExpectations};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::node::{NodeCheckResult, NodeKind, SubCheck};
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::scoring::{self, Grade};
use crate::transport::HttpTransport;

/// Checker trait for the two node kinds
#[async_trait::async_trait]
pub trait ProtocolChecker: Send + Sync {
    fn kind(&self) -> NodeKind;

    /// Run every sub-check against `base_url`, recording outcomes on `result`.
    /// Only called for nodes that accepted at least one TCP connection.
    async fn check(&self, base_url: &str, result: &mut NodeCheckResult);
}

/// GET `url` and decode the JSON body, retrying per `retry`
pub(crate) async fn fetch_json<T: DeserializeOwned + Send>(
    transport: &dyn HttpTransport,
    retry: &RetryPolicy,
    url: &str,
) -> RetryOutcome<T> {
    retry.run(move |_| async move { transport.get(url).await?.decode::<T>() }).await
}

/// Parse a numeric quantity: `0x` hex string, decimal string or JSON number
pub(crate) fn parse_quantity(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => text.parse().ok(),
        },
        _ => None,
    }
}

/// Score a peer count against the shared tier table
pub(crate) fn record_peers(result: &mut NodeCheckResult, peers: u64, attempts: usize) {
    result.peer_count = Some(peers);
    let award = scoring::peer_award(peers);
    let check = SubCheck::new("peers").with_attempts(attempts);

    let check = match award.grade {
        Grade::Full | Grade::Partial => check.pass(award.points, format!("{peers} peers")),
        Grade::Minimal => {
            result.add_issue(format!("low peer count ({peers} peers)"));
            check.warn(award.points, format!("{peers} peers (minimal)"))
        }
        Grade::Zero => {
            result.add_issue(format!("very low peer count ({peers} peers)"));
            check.fail(format!("{peers} peers"))
        }
    };
    result.record(check);
}

/// Score the round trip of a representative read call
pub(crate) fn record_latency<T>(result: &mut NodeCheckResult, outcome: &RetryOutcome<T>) {
    let check = SubCheck::new("latency").with_attempts(outcome.attempts.len());

    let Some(latency_ms) = outcome.latency_ms() else {
        result.add_issue(format!("latency probe {}", outcome.failure_summary()));
        result.record(check.fail(outcome.failure_summary()));
        return;
    };

    result.latency_ms = Some(latency_ms);
    let award = scoring::latency_award(latency_ms);
    let check = check.with_latency(Some(latency_ms));
    let detail = format!("{latency_ms:.0}ms round trip");

    let check = match award.grade {
        Grade::Full => check.pass(award.points, detail),
        Grade::Partial | Grade::Minimal => check.warn(award.points, detail),
        Grade::Zero => {
            result.add_issue(format!("very slow response ({latency_ms:.0}ms)"));
            check.fail(detail)
        }
    };
    result.record(check);
}
