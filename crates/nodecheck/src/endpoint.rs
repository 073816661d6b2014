//! Endpoint parsing.
//!
//! Accepts `[scheme "://"] host [":" port] ["/" path...]`, the shape operators
//! actually type on the command line (`localhost:5052`, `http://10.0.0.2:8545`,
//! `https://rpc.example.org/v1/key`).

use std::fmt;

use serde::Serialize;
use url::{Host, Url};

use crate::error::{NodeCheckError, Result};

/// Default HTTP API port of a consensus (beacon) node
pub const CONSENSUS_DEFAULT_PORT: u16 = 5052;

/// Default JSON-RPC port of an execution node
pub const EXECUTION_DEFAULT_PORT: u16 = 8545;

const HTTPS_PORT: u16 = 443;

/// A parsed endpoint. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSpec {
    pub scheme: Option<String>,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl EndpointSpec {
    /// Parse `raw`, falling back to `default_port` when no port is given
    /// (443 instead for `https`).
    pub fn parse(raw: &str, default_port: u16) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NodeCheckError::invalid_endpoint(raw, "empty endpoint"));
        }

        let (scheme, target) = match trimmed.split_once("://") {
            Some((_, rest)) if rest.contains("://") => {
                return Err(NodeCheckError::invalid_endpoint(raw, "malformed scheme separator"));
            }
            Some((scheme, _)) => {
                let scheme = scheme.to_ascii_lowercase();
                if !matches!(scheme.as_str(), "http" | "https") {
                    return Err(NodeCheckError::invalid_endpoint(raw, "unsupported scheme"));
                }
                (Some(scheme), trimmed.to_string())
            }
            // `http:/host` and `host:/path` both end up here
            None if trimmed.contains(":/") => {
                return Err(NodeCheckError::invalid_endpoint(raw, "malformed scheme separator"));
            }
            None => (None, format!("http://{trimmed}")),
        };

        let url = Url::parse(&target)
            .map_err(|error| NodeCheckError::invalid_endpoint(raw, error.to_string()))?;
        let host = match url.host() {
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => return Err(NodeCheckError::invalid_endpoint(raw, "missing host")),
        };

        let port = match explicit_port(&url, &target) {
            Some(0) => return Err(NodeCheckError::invalid_endpoint(raw, "port 0 is not valid")),
            Some(port) => port,
            None if scheme.as_deref() == Some("https") => HTTPS_PORT,
            None => default_port,
        };

        Ok(Self { scheme, host, port, path: url.path().trim_end_matches('/').to_string() })
    }

    /// Base URL for HTTP requests against this endpoint. Missing schemes
    /// default to plain `http`.
    pub fn base_url(&self) -> String {
        let scheme = self.scheme.as_deref().unwrap_or("http");
        format!("{scheme}://{self}{}", self.path)
    }
}

impl fmt::Display for EndpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Resolve a raw endpoint into `(host, port)`.
pub fn resolve(raw: &str, default_port: u16) -> Result<(String, u16)> {
    EndpointSpec::parse(raw, default_port).map(|spec| (spec.host, spec.port))
}

/// The port written in `target`. `Url::port` hides a port equal to the
/// scheme default (`http://host:80`), so that case is read back from the text.
fn explicit_port(url: &Url, target: &str) -> Option<u16> {
    url.port().or_else(|| {
        let host = url.host()?;
        let known = url.port_or_known_default()?;
        target.to_ascii_lowercase().contains(&format!("{host}:{known}")).then_some(known)
    })
}
