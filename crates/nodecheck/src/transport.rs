use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Raw HTTP reply: status code and body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode a successful reply as JSON. Non-2xx statuses and malformed
    /// bodies are both errors, so the retry policy treats them alike.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        if !self.is_success() {
            return Err(TransportError::Status(self.status));
        }
        serde_json::from_str(&self.body).map_err(|e| TransportError::Body(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Body(String),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

/// HTTP seam used by the protocol checkers
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpReply, TransportError>;

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpReply, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("nodecheck/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    async fn into_reply(response: reqwest::Response) -> Result<HttpReply, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(HttpReply { status, body })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpReply, TransportError> {
        let response = self.client.get(url).send().await?;
        Self::into_reply(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpReply, TransportError> {
        let response = self.client.post(url).json(body).send().await?;
        Self::into_reply(response).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for checker tests

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;

    /// Replies keyed by `GET <url>` or `POST <rpc method>`. Each call pops
    /// the next scripted reply; the last one repeats once the queue drains.
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<HashMap<String, VecDeque<Result<HttpReply, TransportError>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on_get(self, url: &str, reply: Result<HttpReply, TransportError>) -> Self {
            self.push(format!("GET {url}"), reply)
        }

        pub fn on_rpc(self, method: &str, reply: Result<HttpReply, TransportError>) -> Self {
            self.push(format!("POST {method}"), reply)
        }

        /// JSON-RPC success envelope around `result`
        pub fn rpc_result(self, method: &str, result: serde_json::Value) -> Self {
            let body = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": result });
            self.on_rpc(method, Ok(HttpReply::new(200, body.to_string())))
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push(self, key: String, reply: Result<HttpReply, TransportError>) -> Self {
            self.replies.lock().unwrap().entry(key).or_default().push_back(reply);
            self
        }

        fn next(&self, key: String) -> Result<HttpReply, TransportError> {
            self.calls.lock().unwrap().push(key.clone());
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().cloned().unwrap(),
                None => Err(TransportError::Status(404)),
            }
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<HttpReply, TransportError> {
            self.next(format!("GET {url}"))
        }

        async fn post_json(
            &self,
            _url: &str,
            body: &serde_json::Value,
        ) -> Result<HttpReply, TransportError> {
            let method = body["method"].as_str().unwrap_or_default();
            self.next(format!("POST {method}"))
        }
    }
}
