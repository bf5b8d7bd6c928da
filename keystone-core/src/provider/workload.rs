//! Signer backed by a short-lived workload identity.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::{ProviderError, SignerProvider};
use crate::model::CredentialSource;
use crate::signer::{chain, KeySigner, PrivateKey, Signer};
use crate::workload::{WorkloadIdentityClient, X509Svid};

/// Obtains an X.509 SVID from a workload attestation agent.
///
/// Every failure, including an unparseable or already expired SVID, is
/// reported as [`ProviderError::IdentityUnavailable`].
pub struct WorkloadIdentityProvider {
    endpoint: String,
    client: Arc<dyn WorkloadIdentityClient>,
}

impl WorkloadIdentityProvider {
    /// Create a provider for the agent at `endpoint`.
    pub fn new(endpoint: impl Into<String>, client: Arc<dyn WorkloadIdentityClient>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl SignerProvider for WorkloadIdentityProvider {
    fn source(&self) -> CredentialSource {
        CredentialSource::WorkloadIdentity
    }

    async fn load(&self) -> Result<Box<dyn Signer>, ProviderError> {
        debug!("requesting workload identity from {}", self.endpoint);

        let svid = self
            .client
            .fetch_x509_svid(&self.endpoint)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let signer = signer_from_svid(&svid)?;

        if let Some(expires_at) = signer.not_after() {
            if expires_at <= Utc::now() {
                return Err(unavailable(format!(
                    "identity {} expired at {}",
                    svid.spiffe_id, expires_at
                )));
            }
            debug!("identity {} valid until {}", svid.spiffe_id, expires_at);
        }

        Ok(Box::new(signer))
    }
}

fn signer_from_svid(svid: &X509Svid) -> Result<KeySigner, ProviderError> {
    let key = PrivateKey::from_pem(svid.x509_svid_key.as_bytes())
        .map_err(|e| unavailable(format!("agent returned an unusable key: {}", e)))?;

    let mut certificates = chain::load_certificates(svid.x509_svid.as_bytes())
        .map_err(|e| unavailable(format!("agent returned an unusable certificate: {}", e)))?;
    let leaf = certificates.remove(0);

    KeySigner::new(key)
        .and_then(|signer| signer.with_certificate(leaf, certificates))
        .map_err(|e| unavailable(format!("agent returned an inconsistent identity: {}", e)))
}

fn unavailable(message: String) -> ProviderError {
    ProviderError::IdentityUnavailable { message }
}
