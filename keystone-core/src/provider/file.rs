//! Signer backed by key and certificate files on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

use super::{ProviderError, SignerProvider};
use crate::model::CredentialSource;
use crate::signer::{chain, KeySigner, PrivateKey, Signer, SignerError};

/// Loads a private key plus optional leaf certificate and intermediates.
///
/// The certificate file may itself hold a bundle; certificates after the
/// first are treated as intermediates, ahead of any given separately.
#[derive(Debug, Clone)]
pub struct FileProvider {
    key_path: PathBuf,
    certificate_path: Option<PathBuf>,
    intermediate_paths: Vec<PathBuf>,
}

impl FileProvider {
    /// Create a provider for a private key file.
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            certificate_path: None,
            intermediate_paths: Vec::new(),
        }
    }

    /// Bind the key to a leaf certificate file.
    pub fn with_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_path = Some(path.into());
        self
    }

    /// Add intermediate certificate files.
    pub fn with_intermediates(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.intermediate_paths.extend(paths);
        self
    }

    fn load_key(&self, pem: &[u8]) -> Result<KeySigner, ProviderError> {
        let key = PrivateKey::from_pem(pem).map_err(|e| key_load(&self.key_path, e))?;
        KeySigner::new(key).map_err(|e| key_load(&self.key_path, e))
    }
}

#[async_trait]
impl SignerProvider for FileProvider {
    fn source(&self) -> CredentialSource {
        CredentialSource::File
    }

    async fn load(&self) -> Result<Box<dyn Signer>, ProviderError> {
        debug!("loading signing key from {:?}", self.key_path);

        let key_pem = Zeroizing::new(read_file(&self.key_path).await?);
        let signer = self.load_key(&key_pem)?;

        let Some(certificate_path) = &self.certificate_path else {
            if !self.intermediate_paths.is_empty() {
                return Err(ProviderError::ChainMismatch {
                    message: "intermediate certificates given without a leaf certificate"
                        .to_string(),
                });
            }
            return Ok(Box::new(signer));
        };

        let mut certificates = read_certificates(certificate_path).await?;
        let leaf = certificates.remove(0);
        let mut intermediates = certificates;
        for path in &self.intermediate_paths {
            intermediates.extend(read_certificates(path).await?);
        }

        debug!(
            "binding key {} to certificate {} with {} intermediate(s)",
            signer.key_id(),
            chain::subject(&leaf),
            intermediates.len()
        );

        let signer = signer
            .with_certificate(leaf, intermediates)
            .map_err(|e| match e {
                SignerError::ChainMismatch { message } => ProviderError::ChainMismatch { message },
                other => key_load(certificate_path, other),
            })?;

        Ok(Box::new(signer))
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ProviderError> {
    tokio::fs::read(path).await.map_err(|e| ProviderError::KeyLoad {
        path: path.to_path_buf(),
        message: format!("failed to read file: {}", e),
    })
}

async fn read_certificates(path: &Path) -> Result<Vec<x509_cert::Certificate>, ProviderError> {
    let pem = read_file(path).await?;
    chain::load_certificates(&pem).map_err(|e| key_load(path, e))
}

fn key_load(path: &Path, error: SignerError) -> ProviderError {
    ProviderError::KeyLoad {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
