//! Integration tests for the Unix socket workload client.
//!
//! A fake agent answers newline-delimited JSON-RPC requests on a socket in a
//! temporary directory.
#![cfg(unix)]

use keystone_core::{
    CredentialConfig, CredentialSource, ProviderError, SignerResolver, SocketWorkloadClient,
    WorkloadError, WorkloadIdentityClient,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

const SVID_KEY: &str = include_str!("data/svid_key.pem");
const SVID_CHAIN: &str = include_str!("data/svid_chain.pem");

/// Detect whether the sandbox allows binding Unix sockets. Skip tests if not.
fn can_bind_unix_socket() -> bool {
    let path = std::env::temp_dir().join("keystone-socket-permission-check.sock");
    let _ = std::fs::remove_file(&path);
    let ok = std::os::unix::net::UnixListener::bind(&path).is_ok();
    let _ = std::fs::remove_file(&path);
    ok
}

/// How the fake agent answers.
#[derive(Clone)]
enum Reply {
    Svid,
    Error(i32, &'static str),
    Silence,
}

/// Start a fake agent that serves one connection. Returns the temp dir
/// (which must be kept alive) and the socket path.
fn spawn_agent(reply: Reply) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = temp_dir.path().join("agent.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let request: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(request["method"], "fetch_x509_svid");

        let response = match reply {
            Reply::Svid => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "result": {
                    "spiffe_id": "spiffe://example.org/ci/builder",
                    "x509_svid": SVID_CHAIN,
                    "x509_svid_key": SVID_KEY,
                }
            }),
            Reply::Error(code, message) => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": { "code": code, "message": message }
            }),
            Reply::Silence => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                return;
            }
        };

        let mut body = serde_json::to_string(&response).unwrap();
        body.push('\n');
        writer.write_all(body.as_bytes()).await.unwrap();
        writer.flush().await.unwrap();
    });

    (temp_dir, socket_path)
}

#[tokio::test]
async fn test_fetch_svid_over_socket() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test: unix sockets unavailable");
        return;
    }

    let (_temp, socket_path) = spawn_agent(Reply::Svid);
    let endpoint = format!("unix://{}", socket_path.display());

    let svid = SocketWorkloadClient::new()
        .fetch_x509_svid(&endpoint)
        .await
        .unwrap();

    assert_eq!(svid.spiffe_id, "spiffe://example.org/ci/builder");
    assert_eq!(svid.x509_svid, SVID_CHAIN);
}

#[tokio::test]
async fn test_agent_error_is_surfaced() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test: unix sockets unavailable");
        return;
    }

    let (_temp, socket_path) = spawn_agent(Reply::Error(-32001, "no identity issued"));

    let result = SocketWorkloadClient::new()
        .fetch_x509_svid(&socket_path.to_string_lossy())
        .await;

    match result {
        Err(WorkloadError::AgentError { code, message }) => {
            assert_eq!(code, -32001);
            assert_eq!(message, "no identity issued");
        }
        other => panic!("expected AgentError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_silent_agent_times_out() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test: unix sockets unavailable");
        return;
    }

    let (_temp, socket_path) = spawn_agent(Reply::Silence);

    let result = SocketWorkloadClient::new()
        .with_timeout(Duration::from_millis(200))
        .fetch_x509_svid(&socket_path.to_string_lossy())
        .await;

    assert!(matches!(result, Err(WorkloadError::Timeout)));
}

#[tokio::test]
async fn test_resolver_end_to_end() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test: unix sockets unavailable");
        return;
    }

    let (_temp, socket_path) = spawn_agent(Reply::Svid);
    let key_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/ed25519.pem");
    let config = CredentialConfig::default()
        .with_workload_socket(socket_path.to_string_lossy())
        .with_key_path(key_path);

    let result = SignerResolver::with_workload_timeout(Duration::from_secs(2))
        .resolve(&config)
        .await;

    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    assert_eq!(result.signers.len(), 2);
    assert_eq!(result.signers[0].algorithm(), "ecdsa-p256-sha256");
    assert_eq!(result.signers[1].algorithm(), "ed25519");
}

#[tokio::test]
async fn test_resolver_reports_missing_agent() {
    let temp = TempDir::new().unwrap();
    let config = CredentialConfig::default()
        .with_workload_socket(temp.path().join("absent.sock").to_string_lossy());

    let result = SignerResolver::new().resolve(&config).await;

    assert!(result.signers.is_empty());
    assert_eq!(result.errors[0].origin, CredentialSource::WorkloadIdentity);
    assert!(matches!(
        result.errors[0].error,
        ProviderError::IdentityUnavailable { .. }
    ));
}
