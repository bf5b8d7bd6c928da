//! Credential provider adapters.
//!
//! This module provides:
//! - [`SignerProvider`] - Trait producing a [`Signer`] from one credential source
//! - [`WorkloadIdentityProvider`] - Short-lived identity from a workload attestation agent
//! - [`FileProvider`] - Private key and optional certificate chain read from disk
//! - [`ProviderError`] - Per-source failure, collected rather than raised by the resolver
//!
//! Each provider is invoked at most once per invocation and makes a single
//! attempt; there is no retry at this layer.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::CredentialSource;
use crate::signer::Signer;

mod file;
mod workload;

pub use file::FileProvider;
pub use workload::WorkloadIdentityProvider;

/// Error type for credential provider adapters.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The workload attestation agent issued no usable identity.
    #[error("workload identity unavailable: {message}")]
    IdentityUnavailable { message: String },

    /// A key or certificate file is missing, unreadable or unparseable.
    #[error("failed to load {}: {message}", path.display())]
    KeyLoad { path: PathBuf, message: String },

    /// An intermediate certificate cannot be linked to the leaf certificate.
    #[error("certificate chain mismatch: {message}")]
    ChainMismatch { message: String },
}

impl ProviderError {
    /// Short name of the error kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IdentityUnavailable { .. } => "identity_unavailable",
            Self::KeyLoad { .. } => "key_load",
            Self::ChainMismatch { .. } => "chain_mismatch",
        }
    }
}

/// Produces a signer from a single configured credential source.
#[async_trait]
pub trait SignerProvider: Send + Sync {
    /// The credential source this provider reads from.
    fn source(&self) -> CredentialSource;

    /// Make one attempt at producing a signer.
    async fn load(&self) -> Result<Box<dyn Signer>, ProviderError>;
}
