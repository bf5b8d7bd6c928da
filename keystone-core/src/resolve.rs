//! Signer resolution across independent credential sources.
//!
//! This module provides:
//! - [`SignerResolver`] - Evaluates configured sources in order and aggregates outcomes
//! - [`ResolutionResult`] - Signers and errors, both in evaluation order
//! - [`ResolutionError`] - A provider failure tagged with its source
//!
//! A failure in one source never prevents the others from being attempted,
//! and resolution itself never fails: whether zero signers is acceptable is
//! the caller's decision.
//!
//! # Example
//!
//! ```rust,ignore
//! use keystone_core::{CredentialConfig, SignerResolver};
//!
//! let config = CredentialConfig::default().with_key_path("signer.pem");
//! let result = SignerResolver::new().resolve(&config).await;
//!
//! for error in &result.errors {
//!     eprintln!("{}", error);
//! }
//! if result.signers.is_empty() {
//!     return Err("at least one signer is required".into());
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{CredentialConfig, CredentialSource};
use crate::provider::{FileProvider, ProviderError, SignerProvider, WorkloadIdentityProvider};
use crate::signer::Signer;
use crate::socket::SocketWorkloadClient;
use crate::workload::WorkloadIdentityClient;

/// A provider failure paired with the credential source that produced it.
#[derive(Debug, Error)]
#[error("failed to create signer from {origin} source: {error}")]
pub struct ResolutionError {
    /// The source whose provider failed.
    pub origin: CredentialSource,

    /// What went wrong.
    #[source]
    pub error: ProviderError,
}

impl ResolutionError {
    /// Create a new resolution error.
    pub fn new(origin: CredentialSource, error: ProviderError) -> Self {
        Self { origin, error }
    }
}

/// Outcome of resolving every configured credential source.
///
/// Both sequences preserve evaluation order (workload identity, then file).
/// Both are empty when nothing is configured; both are non-empty on partial
/// success.
#[derive(Default)]
pub struct ResolutionResult {
    /// Successfully created signers.
    pub signers: Vec<Box<dyn Signer>>,

    /// Failures, one per failed source.
    pub errors: Vec<ResolutionError>,
}

impl ResolutionResult {
    /// Whether no signer was produced.
    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    /// Whether any source failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Sources of the recorded errors, in order.
    pub fn error_sources(&self) -> Vec<CredentialSource> {
        self.errors.iter().map(|e| e.origin).collect()
    }

    /// Split into signers and errors.
    pub fn into_parts(self) -> (Vec<Box<dyn Signer>>, Vec<ResolutionError>) {
        (self.signers, self.errors)
    }

    fn record(&mut self, origin: CredentialSource, outcome: Result<Box<dyn Signer>, ProviderError>) {
        match outcome {
            Ok(signer) => {
                debug!(source = %origin, key_id = signer.key_id(), "resolved signer");
                self.signers.push(signer);
            }
            Err(error) => {
                warn!(source = %origin, kind = error.kind(), "failed to create signer: {}", error);
                self.errors.push(ResolutionError::new(origin, error));
            }
        }
    }
}

impl fmt::Debug for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionResult")
            .field(
                "signers",
                &self.signers.iter().map(|s| s.key_id()).collect::<Vec<_>>(),
            )
            .field("errors", &self.errors)
            .finish()
    }
}

/// Resolves signers from a [`CredentialConfig`].
///
/// Providers are awaited strictly one after another, never concurrently, so
/// result order always matches source order.
#[derive(Clone)]
pub struct SignerResolver {
    workload_client: Arc<dyn WorkloadIdentityClient>,
}

impl Default for SignerResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SignerResolver {
    /// Create a resolver using the Unix socket workload client.
    pub fn new() -> Self {
        Self::with_workload_client(Arc::new(SocketWorkloadClient::new()))
    }

    /// Create a resolver whose socket client uses a custom timeout.
    pub fn with_workload_timeout(timeout: Duration) -> Self {
        Self::with_workload_client(Arc::new(SocketWorkloadClient::new().with_timeout(timeout)))
    }

    /// Create a resolver with a custom workload identity client.
    pub fn with_workload_client(client: Arc<dyn WorkloadIdentityClient>) -> Self {
        Self {
            workload_client: client,
        }
    }

    /// Build the providers for every configured source, in evaluation order.
    pub fn providers(&self, config: &CredentialConfig) -> Vec<Box<dyn SignerProvider>> {
        let mut providers: Vec<Box<dyn SignerProvider>> = Vec::new();

        if let Some(endpoint) = config.workload_socket.as_deref().filter(|s| !s.is_empty()) {
            providers.push(Box::new(WorkloadIdentityProvider::new(
                endpoint,
                Arc::clone(&self.workload_client),
            )));
        }

        if let Some(key_path) = config.key_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            let mut provider = FileProvider::new(key_path)
                .with_intermediates(config.intermediate_paths.iter().cloned());
            if let Some(certificate_path) = &config.certificate_path {
                provider = provider.with_certificate(certificate_path);
            }
            providers.push(Box::new(provider));
        }

        providers
    }

    /// Attempt every configured source once and aggregate the outcomes.
    pub async fn resolve(&self, config: &CredentialConfig) -> ResolutionResult {
        let mut result = ResolutionResult::default();

        for provider in self.providers(config) {
            let outcome = provider.load().await;
            result.record(provider.source(), outcome);
        }

        debug!(
            signers = result.signers.len(),
            errors = result.errors.len(),
            "signer resolution finished"
        );
        result
    }
}

/// Resolve signers with the default Unix socket workload client.
pub async fn resolve_signers(config: &CredentialConfig) -> ResolutionResult {
    SignerResolver::new().resolve(config).await
}
