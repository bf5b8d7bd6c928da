//! Workload agent client over a Unix domain socket.
//!
//! Requests are newline-delimited JSON-RPC 2.0. One connection is opened per
//! request, and both the connect and the read are bounded by the timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

use crate::workload::{parse_endpoint, Result, WorkloadError, WorkloadIdentityClient, X509Svid};

#[cfg(unix)]
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
#[cfg(unix)]
use tokio::net::UnixStream;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Method name for fetching an X.509 SVID.
pub const FETCH_X509_SVID: &str = "fetch_x509_svid";

/// JSON-RPC 2.0 request.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

/// Counter for generating unique request IDs.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Workload identity client speaking JSON-RPC over a Unix socket.
#[derive(Debug, Clone)]
pub struct SocketWorkloadClient {
    timeout: Duration,
}

impl Default for SocketWorkloadClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketWorkloadClient {
    /// Create a client with the default timeout.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a JSON-RPC request to the agent.
    #[cfg(unix)]
    async fn send_request(
        &self,
        endpoint: &str,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let socket_path = parse_endpoint(endpoint)?;
        debug!("connecting to workload agent at {:?}", socket_path);

        let stream = tokio::time::timeout(self.timeout, UnixStream::connect(&socket_path))
            .await
            .map_err(|_| WorkloadError::Timeout)?
            .map_err(|e| {
                WorkloadError::AgentUnavailable(format!(
                    "failed to connect to {}: {}",
                    socket_path.display(),
                    e
                ))
            })?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let request_id = REQUEST_ID.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: request_id,
            method,
            params,
        };

        let request_json = serde_json::to_string(&request)?;
        trace!("sending request: {}", request_json);

        writer.write_all(request_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        let mut response_line = String::new();
        let read = tokio::time::timeout(self.timeout, reader.read_line(&mut response_line))
            .await
            .map_err(|_| WorkloadError::Timeout)?
            .map_err(|e| WorkloadError::NetworkError(format!("failed to read response: {}", e)))?;

        if read == 0 {
            return Err(WorkloadError::NetworkError(
                "agent closed the connection without responding".to_string(),
            ));
        }

        // The response carries key material; never trace it.
        trace!("received {} byte response", read);

        let response: JsonRpcResponse = serde_json::from_str(&response_line)?;

        if let Some(error) = response.error {
            return Err(WorkloadError::AgentError {
                code: error.code,
                message: error.message,
            });
        }

        response.result.ok_or_else(|| WorkloadError::AgentError {
            code: -32600,
            message: "missing result in response".to_string(),
        })
    }

    /// Stub for non-Unix platforms.
    #[cfg(not(unix))]
    async fn send_request(
        &self,
        _endpoint: &str,
        _method: &str,
        _params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        Err(WorkloadError::AgentUnavailable(
            "workload agent sockets are not supported on this platform".to_string(),
        ))
    }
}

#[async_trait]
impl WorkloadIdentityClient for SocketWorkloadClient {
    async fn fetch_x509_svid(&self, endpoint: &str) -> Result<X509Svid> {
        let response = self.send_request(endpoint, FETCH_X509_SVID, None).await?;
        let svid: X509Svid = serde_json::from_value(response)?;
        debug!("agent issued identity {}", svid.spiffe_id);
        Ok(svid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_request_serialization() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: FETCH_X509_SVID,
            params: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"fetch_x509_svid\""));
        assert!(!json.contains("params"));
    }

    #[test]
    fn test_json_rpc_error_deserialization() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32001,"message":"no identity issued"}}"#;
        let response: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32001);
    }

    #[test]
    fn test_timeout_builder() {
        let client = SocketWorkloadClient::new().with_timeout(Duration::from_millis(250));
        assert_eq!(client.timeout(), Duration::from_millis(250));
        assert_eq!(SocketWorkloadClient::default().timeout(), DEFAULT_TIMEOUT);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_endpoint_is_reported() {
        let client = SocketWorkloadClient::new();
        let result = client.fetch_x509_svid("tcp://127.0.0.1:1").await;
        assert!(matches!(result, Err(WorkloadError::InvalidEndpoint(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_socket_is_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let endpoint = dir.path().join("absent.sock");

        let client = SocketWorkloadClient::new();
        let result = client.fetch_x509_svid(&endpoint.to_string_lossy()).await;
        assert!(matches!(result, Err(WorkloadError::AgentUnavailable(_))));
    }
}
