//! X.509 certificate loading and intermediate linking.

use chrono::{DateTime, Utc};
use x509_cert::Certificate;
use x509_cert::der::pem::LineEnding;
use x509_cert::der::{Encode, EncodePem};

use super::SignerError;

/// Parse every certificate in a PEM bundle, in file order.
///
/// Fails if the input holds no certificate or any block is malformed.
pub fn load_certificates(pem: &[u8]) -> Result<Vec<Certificate>, SignerError> {
    // load_pem_chain underflows on blank input.
    if pem.iter().all(u8::is_ascii_whitespace) {
        return Err(no_certificate());
    }

    let certificates =
        Certificate::load_pem_chain(pem).map_err(|e| SignerError::InvalidCertificate {
            message: e.to_string(),
        })?;

    if certificates.is_empty() {
        return Err(no_certificate());
    }

    Ok(certificates)
}

fn no_certificate() -> SignerError {
    SignerError::InvalidCertificate {
        message: "no PEM certificate found".to_string(),
    }
}

/// Order intermediates so that each one issued the certificate before it.
///
/// Linking walks from the leaf's issuer name to a matching intermediate
/// subject, repeatedly, until a self-issued certificate or a missing issuer
/// ends the walk. Input order does not matter and repeated certificates
/// count once. Any intermediate left over does not chain to the leaf and is
/// reported as a mismatch.
pub fn link_intermediates(
    leaf: &Certificate,
    intermediates: Vec<Certificate>,
) -> Result<Vec<Certificate>, SignerError> {
    let mut remaining: Vec<Certificate> = Vec::with_capacity(intermediates.len());
    for certificate in intermediates {
        if certificate != *leaf && !remaining.contains(&certificate) {
            remaining.push(certificate);
        }
    }

    let mut linked = Vec::with_capacity(remaining.len());
    let mut issuer_name = leaf.tbs_certificate.issuer.clone();
    let mut subject_name = leaf.tbs_certificate.subject.clone();

    while issuer_name != subject_name {
        let Some(index) = remaining
            .iter()
            .position(|c| c.tbs_certificate.subject == issuer_name)
        else {
            break;
        };

        let next = remaining.remove(index);
        issuer_name = next.tbs_certificate.issuer.clone();
        subject_name = next.tbs_certificate.subject.clone();
        linked.push(next);
    }

    if let Some(stray) = remaining.first() {
        return Err(SignerError::ChainMismatch {
            message: format!(
                "intermediate certificate \"{}\" does not chain to leaf certificate \"{}\"",
                stray.tbs_certificate.subject, leaf.tbs_certificate.subject
            ),
        });
    }

    Ok(linked)
}

/// DER-encoded SubjectPublicKeyInfo of a certificate.
pub fn public_key_der(certificate: &Certificate) -> Result<Vec<u8>, SignerError> {
    certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| SignerError::InvalidCertificate {
            message: format!("failed to encode certificate public key: {}", e),
        })
}

/// End of the certificate's validity period.
pub fn not_after(certificate: &Certificate) -> Option<DateTime<Utc>> {
    let since_epoch = certificate.tbs_certificate.validity.not_after.to_unix_duration();
    let secs = i64::try_from(since_epoch.as_secs()).ok()?;
    DateTime::from_timestamp(secs, 0)
}

/// PEM encoding of a certificate.
pub fn to_pem(certificate: &Certificate) -> Result<String, SignerError> {
    certificate
        .to_pem(LineEnding::LF)
        .map_err(|e| SignerError::InvalidCertificate {
            message: format!("failed to encode certificate: {}", e),
        })
}

/// RFC 4514 rendering of the certificate subject.
pub fn subject(certificate: &Certificate) -> String {
    certificate.tbs_certificate.subject.to_string()
}
