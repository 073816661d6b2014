//! nodecheck - readiness assessment for validator node pairs
//!
//! Probes a consensus-layer node and an execution-layer node, runs the
//! protocol checks each one supports, and turns the outcomes into a weighted
//! score and a readiness tier.
//!
//! The engine only produces structured results ([`AssessmentResult`]);
//! rendering them is left to the caller.

pub mod assessor;
pub mod checker;
pub mod config;
pub mod diagnosis;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod monitor;
pub mod node;
pub mod probe;
pub mod resources;
pub mod retry;
pub mod scoring;
pub mod transport;

// Re-export main types
pub use assessor::{AssessmentResult, ReadinessTier, assess};
pub use checker::{ConsensusChecker, ExecutionChecker, ProtocolChecker};
pub use config::Config;
pub use diagnosis::{ConnectivityStatus, Diagnosis, classify};
pub use endpoint::EndpointSpec;
pub use error::{NodeCheckError, Result};
pub use executor::AssessmentExecutor;
pub use monitor::MonitorLoop;
pub use node::{CheckStatus, NodeCheckResult, NodeKind, SubCheck};
pub use probe::{ConnectivityResult, TcpProber};
pub use resources::{NoopResourceProbe, ResourceProbe, ResourceSnapshot, SystemResourceProbe};
pub use retry::{RetryAttempt, RetryOutcome, RetryPolicy};
pub use transport::{HttpReply, HttpTransport, ReqwestTransport, TransportError};

/// Chain id of the Sepolia test network, the default expected execution network
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
