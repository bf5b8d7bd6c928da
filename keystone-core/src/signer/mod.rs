//! Signing capability abstraction.
//!
//! This module provides:
//! - [`Signer`] - Trait for a resolved signing identity
//! - [`KeySigner`] - Signer backed by an in-process private key and optional certificate chain
//! - [`PrivateKey`] - PEM private key parsing (ECDSA P-256, Ed25519)
//! - [`chain`] - X.509 certificate loading and intermediate linking
//!
//! # Key IDs
//!
//! A signer's key ID is the lowercase hex SHA-256 digest of its DER-encoded
//! SubjectPublicKeyInfo, so the same key yields the same ID from every source.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use x509_cert::Certificate;

pub mod chain;
mod key;

pub use key::PrivateKey;

/// Error type for key, certificate and signing operations.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The private key is password protected.
    #[error("encrypted private keys are not supported")]
    EncryptedKey,

    /// The private key could not be parsed or uses an unsupported algorithm.
    #[error("invalid private key: {message}")]
    InvalidKey { message: String },

    /// A certificate could not be parsed.
    #[error("invalid certificate: {message}")]
    InvalidCertificate { message: String },

    /// The leaf certificate was issued for a different key.
    #[error("certificate public key does not match the private key")]
    KeyMismatch,

    /// An intermediate certificate does not link to the leaf.
    #[error("certificate chain mismatch: {message}")]
    ChainMismatch { message: String },

    /// The signing primitive failed.
    #[error("signing failed: {message}")]
    Signing { message: String },
}

/// A resolved signing identity.
///
/// Signers are created fresh for each invocation and owned by the caller.
/// Signing is CPU-bound and synchronous.
pub trait Signer: Send + Sync + fmt::Debug {
    /// Hex SHA-256 of the DER SubjectPublicKeyInfo.
    fn key_id(&self) -> &str;

    /// Signature algorithm identifier (e.g. `ecdsa-p256-sha256`).
    fn algorithm(&self) -> &'static str;

    /// Sign a message, returning the encoded signature.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;

    /// PEM-encoded public key.
    fn public_key_pem(&self) -> &str;

    /// Leaf certificate bound to the key, if any.
    fn certificate(&self) -> Option<&Certificate>;

    /// Intermediates ordered from the leaf's issuer upward.
    fn intermediates(&self) -> &[Certificate];

    /// When the identity stops being valid, if it is certificate-bound.
    fn not_after(&self) -> Option<DateTime<Utc>> {
        self.certificate().and_then(chain::not_after)
    }
}

/// A signer holding its private key in process memory.
pub struct KeySigner {
    key: PrivateKey,
    key_id: String,
    public_key_pem: String,
    certificate: Option<Certificate>,
    intermediates: Vec<Certificate>,
}

impl KeySigner {
    /// Create a bare-key signer with no certificate.
    pub fn new(key: PrivateKey) -> Result<Self, SignerError> {
        let key_id = hex::encode(Sha256::digest(key.public_key_der()?));
        let public_key_pem = key.public_key_pem()?;

        Ok(Self {
            key,
            key_id,
            public_key_pem,
            certificate: None,
            intermediates: Vec::new(),
        })
    }

    /// Attach a leaf certificate and its intermediates.
    ///
    /// The leaf must carry this signer's public key and every intermediate
    /// must link to the leaf.
    pub fn with_certificate(
        mut self,
        certificate: Certificate,
        intermediates: Vec<Certificate>,
    ) -> Result<Self, SignerError> {
        let leaf_key = chain::public_key_der(&certificate)?;
        if !self.key.matches_public_key(&leaf_key) {
            return Err(SignerError::KeyMismatch);
        }

        self.intermediates = chain::link_intermediates(&certificate, intermediates)?;
        self.certificate = Some(certificate);
        Ok(self)
    }
}

impl Signer for KeySigner {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn algorithm(&self) -> &'static str {
        self.key.algorithm()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        self.key.sign(message)
    }

    fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    fn intermediates(&self) -> &[Certificate] {
        &self.intermediates
    }
}

impl fmt::Debug for KeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySigner")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.key.algorithm())
            .field("certificate", &self.certificate.as_ref().map(chain::subject))
            .field("intermediates", &self.intermediates.len())
            .finish_non_exhaustive()
    }
}
