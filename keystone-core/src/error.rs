//! Top-level error types for Keystone.

use thiserror::Error;

use crate::provider::ProviderError;
use crate::resolve::ResolutionError;
use crate::signer::SignerError;
use crate::sink::SinkError;
use crate::workload::WorkloadError;

/// Top-level error type encompassing all Keystone errors.
#[derive(Debug, Error)]
pub enum KeystoneError {
    /// Error from a credential provider.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A provider failure tagged with its source.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Error from key, certificate or signing operations.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    /// Error from the workload agent client.
    #[error("workload error: {0}")]
    Workload(#[from] WorkloadError),

    /// Error creating the output sink.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// No signer could be resolved where one is required.
    #[error("no signers available: {message}")]
    NoSigners { message: String },
}

impl KeystoneError {
    /// Build a [`NoSigners`](Self::NoSigners) error summarizing the resolution failures.
    pub fn no_signers(errors: &[ResolutionError]) -> Self {
        let message = if errors.is_empty() {
            "no credential source configured".to_string()
        } else {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        };
        Self::NoSigners { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CredentialSource;

    #[test]
    fn test_no_signers_without_sources() {
        let error = KeystoneError::no_signers(&[]);
        assert_eq!(
            error.to_string(),
            "no signers available: no credential source configured"
        );
    }

    #[test]
    fn test_no_signers_lists_failures() {
        let errors = vec![
            ResolutionError::new(
                CredentialSource::WorkloadIdentity,
                ProviderError::IdentityUnavailable {
                    message: "agent request timed out".to_string(),
                },
            ),
            ResolutionError::new(
                CredentialSource::File,
                ProviderError::ChainMismatch {
                    message: "dangling".to_string(),
                },
            ),
        ];

        let message = KeystoneError::no_signers(&errors).to_string();
        assert!(message.contains("workload-identity"));
        assert!(message.contains("; failed to create signer from file source"));
    }
}
