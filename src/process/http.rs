//! JSON-RPC over HTTP for externally launched nodes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{error::NodeError, node::Provider};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// [`Provider`] posting JSON-RPC 2.0 requests to a node's HTTP endpoint.
#[derive(Debug)]
pub struct HttpProvider {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

impl HttpProvider {
    /// Creates a provider for `url` with a 10 s request timeout.
    pub fn new(url: impl Into<String>) -> Result<Self, NodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NodeError::Launch {
                reason: format!("http client: {e}"),
            })?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Provider for a node listening on `127.0.0.1:port`.
    pub fn local(port: u16) -> Result<Self, NodeError> {
        Self::new(format!("http://127.0.0.1:{port}"))
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, NodeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NodeError::rpc(method, e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NodeError::rpc(method, format!("http {status}: {text}")));
        }

        let decoded: RpcResponse = resp.json().await.map_err(|e| NodeError::rpc(method, e))?;
        match decoded {
            RpcResponse {
                error: Some(err), ..
            } => Err(NodeError::rpc(method, format!("{}: {}", err.code, err.message))),
            RpcResponse { result, .. } => Ok(result.unwrap_or(Value::Null)),
        }
    }
}
