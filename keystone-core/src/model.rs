//! Domain model types for Keystone.
//!
//! This module defines the invocation-scoped inputs of signer resolution:
//! - [`CredentialSource`] - Which configured means produced a signer or error
//! - [`CredentialConfig`] - The credential sources configured for one invocation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A configured means of obtaining a signer.
///
/// Sources are evaluated in declaration order: workload identity first,
/// then local files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialSource {
    /// Short-lived identity issued by a local workload attestation agent.
    WorkloadIdentity,
    /// Private key (and optional certificate chain) read from disk.
    File,
}

impl CredentialSource {
    /// Stable tag used in logs and error reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkloadIdentity => "workload-identity",
            Self::File => "file",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential sources configured for a single invocation.
///
/// Every field is optional. The certificate and intermediate paths are only
/// consulted when `key_path` is present.
///
/// # Examples
///
/// ```
/// use keystone_core::CredentialConfig;
///
/// let config = CredentialConfig::default()
///     .with_key_path("signer.pem")
///     .with_certificate_path("signer.crt");
///
/// assert!(config.has_file_source());
/// assert!(!config.has_workload_source());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Workload attestation agent endpoint (socket path or `unix://` URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_socket: Option<String>,

    /// Path to a PEM-encoded private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    /// Path to the PEM-encoded leaf certificate for `key_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<PathBuf>,

    /// Paths to PEM-encoded intermediate certificates, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intermediate_paths: Vec<PathBuf>,
}

impl CredentialConfig {
    /// Build a configuration from raw flag values.
    ///
    /// Empty strings are treated as absent, as are empty intermediate entries.
    pub fn from_flags(
        workload_socket: &str,
        key_path: &str,
        certificate_path: &str,
        intermediate_paths: &[String],
    ) -> Self {
        Self {
            workload_socket: non_empty(workload_socket).map(str::to_string),
            key_path: non_empty(key_path).map(PathBuf::from),
            certificate_path: non_empty(certificate_path).map(PathBuf::from),
            intermediate_paths: intermediate_paths
                .iter()
                .filter_map(|p| non_empty(p))
                .map(PathBuf::from)
                .collect(),
        }
    }

    /// Set the workload attestation endpoint.
    pub fn with_workload_socket(mut self, socket: impl Into<String>) -> Self {
        self.workload_socket = Some(socket.into()).filter(|s| !s.is_empty());
        self
    }

    /// Set the private key path.
    pub fn with_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into()).filter(|p| !p.as_os_str().is_empty());
        self
    }

    /// Set the leaf certificate path.
    pub fn with_certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_path = Some(path.into()).filter(|p| !p.as_os_str().is_empty());
        self
    }

    /// Append an intermediate certificate path.
    pub fn with_intermediate_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.as_os_str().is_empty() {
            self.intermediate_paths.push(path);
        }
        self
    }

    /// Whether a workload attestation endpoint is configured.
    pub fn has_workload_source(&self) -> bool {
        self.workload_socket.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Whether a private key file is configured.
    pub fn has_file_source(&self) -> bool {
        self.key_path
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty())
    }

    /// Whether no credential source is configured at all.
    pub fn is_empty(&self) -> bool {
        !self.has_workload_source() && !self.has_file_source()
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}
