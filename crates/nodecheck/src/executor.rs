use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::assessor::{AssessmentResult, assess};
use crate::checker::{ConsensusChecker, ExecutionChecker, ProtocolChecker};
use crate::config::{Config, Endpoints};
use crate::diagnosis::classify;
use crate::endpoint::EndpointSpec;
use crate::error::Result;
use crate::node::{ConnectivityReport, NodeCheckResult};
use crate::probe::TcpProber;
use crate::resources::ResourceProbe;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Assessment executor - runs one full cycle against both nodes
pub struct AssessmentExecutor {
    endpoints: Endpoints,
    timeout: Duration,
    prober: TcpProber,
    consensus: Arc<dyn ProtocolChecker>,
    execution: Arc<dyn ProtocolChecker>,
    resources: Option<Box<dyn ResourceProbe>>,
}

impl AssessmentExecutor {
    /// Create an executor talking HTTP through `reqwest`
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.probe.timeout())?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create an executor over any [`HttpTransport`]
    pub fn with_transport(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        let retry = config.probe.retry_policy();
        Self {
            endpoints: config.endpoints.clone(),
            timeout: config.probe.timeout(),
            prober: TcpProber::new(config.probe.timeout(), config.probe.retries)
                .with_pause(config.probe.connect_pause()),
            consensus: Arc::new(ConsensusChecker::new(transport.clone(), retry)),
            execution: Arc::new(ExecutionChecker::new(transport, retry, config.network.clone())),
            resources: None,
        }
    }

    /// Attach a host resource probe, sampled once per cycle
    pub fn with_resource_probe(mut self, probe: Box<dyn ResourceProbe>) -> Self {
        self.resources = Some(probe);
        self
    }

    /// Check both nodes, consensus first, and assess the pair
    pub async fn run_cycle(&self) -> AssessmentResult {
        let resources = self.resources.as_ref().and_then(|probe| probe.snapshot());

        let consensus = self.check_node(self.consensus.as_ref(), &self.endpoints.consensus).await;
        let execution = self.check_node(self.execution.as_ref(), &self.endpoints.execution).await;

        assess(consensus, execution).with_resources(resources)
    }

    /// Resolve, probe and (when reachable) protocol-check a single node
    pub async fn check_node(&self, checker: &dyn ProtocolChecker, raw: &str) -> NodeCheckResult {
        let kind = checker.kind();
        let mut result = NodeCheckResult::new(kind, raw);

        let endpoint = match EndpointSpec::parse(raw, kind.default_port()) {
            Ok(endpoint) => endpoint,
            Err(error) => {
                warn!(%kind, endpoint = raw, %error, "Skipping node with invalid endpoint");
                result.add_issue(error.to_string());
                return result;
            }
        };
        result.target = Some(endpoint.to_string());

        let connectivity = self.prober.probe(&endpoint.host, endpoint.port).await;
        let diagnosis = classify(&connectivity, self.timeout, endpoint.port);
        info!(%kind, target = %endpoint, status = %diagnosis.status, "Connectivity probed");

        let status = diagnosis.status;
        if status.is_blocking() {
            result.add_issue(diagnosis.summary.clone());
            for detail in &diagnosis.details {
                result.add_issue(detail.clone());
            }
        } else if status.is_warning() {
            result.add_issue(diagnosis.summary.clone());
        }
        result.connectivity = Some(ConnectivityReport { result: connectivity, diagnosis });

        if status.is_blocking() {
            warn!(%kind, target = %endpoint, "Node unreachable, protocol checks skipped");
            return result;
        }

        result.reachable = true;
        checker.check(&endpoint.base_url(), &mut result).await;
        info!(%kind, score = result.score(), "Node checked");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::ConnectivityStatus;
    use crate::transport::testing::ScriptedTransport;
    use tokio::net::TcpListener;

    fn config(consensus: &str, execution: &str) -> Config {
        let mut config = Config::default();
        config.endpoints.consensus = consensus.to_string();
        config.endpoints.execution = execution.to_string();
        config.probe.timeout_seconds = 2;
        config.probe.retries = 1;
        config.probe.retry_delay_ms = 0;
        config.probe.connect_pause_ms = 0;
        config
    }

    /// A local port nothing listens on
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_invalid_endpoint_scores_zero() {
        let port = closed_port().await;
        let config = config("http:/broken", &format!("127.0.0.1:{port}"));
        let transport = Arc::new(ScriptedTransport::new());
        let executor = AssessmentExecutor::with_transport(&config, transport.clone());

        let result = executor.run_cycle().await;

        assert_eq!(result.consensus.score(), 0);
        assert!(result.consensus.target.is_none());
        assert!(result.consensus.connectivity.is_none());
        assert!(result.issues[0].starts_with("consensus: invalid endpoint"));
        // the execution node is still probed
        assert!(result.execution.connectivity.is_some());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_node_skips_protocol_checks() {
        let port = closed_port().await;
        let config = config(&format!("http://127.0.0.1:{port}"), "http:/broken");
        let transport = Arc::new(ScriptedTransport::new());
        let executor = AssessmentExecutor::with_transport(&config, transport.clone());

        let result = executor.run_cycle().await;
        let consensus = &result.consensus;

        assert!(!consensus.reachable);
        assert_eq!(consensus.score(), 0);
        assert!(consensus.checks.is_empty());
        let report = consensus.connectivity.as_ref().unwrap();
        assert_eq!(report.result.success_rate(), 0.0);
        assert_eq!(report.diagnosis.status, ConnectivityStatus::Error);
        assert!(transport.calls().is_empty());
        assert!(!result.ready);
    }

    #[tokio::test]
    async fn test_reachable_node_runs_checker() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = config(&format!("127.0.0.1:{port}"), "http:/broken");
        let transport = Arc::new(ScriptedTransport::new());
        let executor = AssessmentExecutor::with_transport(&config, transport.clone());

        let result = executor.run_cycle().await;

        assert!(result.consensus.reachable);
        assert_eq!(result.consensus.target.as_deref(), Some(&*format!("127.0.0.1:{port}")));
        // unscripted health endpoint answers 404
        assert!(!result.consensus.healthy);
        assert_eq!(
            transport.calls(),
            [format!("GET http://127.0.0.1:{port}/eth/v1/node/health")]
        );
    }
}
