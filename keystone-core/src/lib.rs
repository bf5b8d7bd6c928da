//! # Keystone Core
//!
//! Signer and output-sink resolution for Keystone attestations.
//!
//! This crate provides:
//! - Credential configuration and source types
//! - A [`Signer`] capability backed by ECDSA P-256 or Ed25519 keys with optional X.509 chains
//! - Credential providers for workload identity agents and local key files
//! - A [`SignerResolver`] that aggregates per-source successes and failures
//! - Output sink selection between a file and standard output
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keystone_core::{resolve_output_sink, CredentialConfig, KeystoneError, SignerResolver};
//! use std::io::Write;
//!
//! async fn sign(payload: &[u8]) -> Result<(), KeystoneError> {
//!     let config = CredentialConfig::from_flags("", "signer.pem", "signer.crt", &[]);
//!     let result = SignerResolver::new().resolve(&config).await;
//!     if result.signers.is_empty() {
//!         return Err(KeystoneError::no_signers(&result.errors));
//!     }
//!
//!     let mut out = resolve_output_sink("signature.bin")?;
//!     out.write_all(&result.signers[0].sign(payload)?).ok();
//!     out.finish().ok();
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod model;
pub mod provider;
pub mod resolve;
pub mod signer;
pub mod sink;
pub mod socket;
pub mod workload;

// Re-export commonly used types at crate root
pub use model::{
    CredentialConfig,
    CredentialSource,
};

pub use signer::{
    KeySigner,
    PrivateKey,
    Signer,
    SignerError,
};

pub use provider::{
    FileProvider,
    ProviderError,
    SignerProvider,
    WorkloadIdentityProvider,
};

pub use resolve::{
    resolve_signers,
    ResolutionError,
    ResolutionResult,
    SignerResolver,
};

pub use sink::{
    resolve_output_sink,
    OutputSink,
    SinkError,
};

pub use socket::SocketWorkloadClient;

pub use workload::{
    WorkloadError,
    WorkloadIdentityClient,
    X509Svid,
};

pub use error::KeystoneError;
