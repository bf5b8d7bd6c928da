//! DSSE envelope signing.
//!
//! Every resolved signer signs the pre-authentication encoding (PAE) of the
//! payload; the envelope carries one signature per signer in resolution order.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use keystone_core::signer::chain;
use keystone_core::Signer;
use serde::{Deserialize, Serialize};

/// Payload type used when none is given.
pub const DEFAULT_PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

/// A DSSE envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub payload_type: String,
    /// Base64 of the raw payload.
    pub payload: String,
    pub signatures: Vec<EnvelopeSignature>,
}

/// One signature over the envelope PAE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeSignature {
    pub keyid: String,
    /// Base64 of the signature bytes.
    pub sig: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intermediates: Vec<String>,
}

/// DSSE pre-authentication encoding.
///
/// `"DSSEv1" SP len(type) SP type SP len(body) SP body`, lengths in ASCII decimal.
pub fn pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let header = format!(
        "DSSEv1 {} {} {} ",
        payload_type.len(),
        payload_type,
        payload.len()
    );
    let mut encoded = Vec::with_capacity(header.len() + payload.len());
    encoded.extend_from_slice(header.as_bytes());
    encoded.extend_from_slice(payload);
    encoded
}

/// Sign `payload` with every signer.
pub fn sign_envelope(
    payload_type: &str,
    payload: &[u8],
    signers: &[Box<dyn Signer>],
) -> Result<Envelope> {
    let message = pae(payload_type, payload);
    let mut signatures = Vec::with_capacity(signers.len());

    for signer in signers {
        let sig = signer
            .sign(&message)
            .with_context(|| format!("signer {} failed", signer.key_id()))?;

        let certificate = signer
            .certificate()
            .map(chain::to_pem)
            .transpose()
            .context("failed to encode signer certificate")?;

        let intermediates = signer
            .intermediates()
            .iter()
            .map(chain::to_pem)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to encode intermediate certificate")?;

        signatures.push(EnvelopeSignature {
            keyid: signer.key_id().to_string(),
            sig: BASE64.encode(sig),
            certificate,
            intermediates,
        });
    }

    Ok(Envelope {
        payload_type: payload_type.to_string(),
        payload: BASE64.encode(payload),
        signatures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::{KeySigner, PrivateKey};

    const KEY: &str = include_str!("../../keystone-core/tests/data/ed25519.pem");

    #[test]
    fn test_pae() {
        assert_eq!(
            pae("http://example.com/HelloWorld", b"hello world"),
            b"DSSEv1 29 http://example.com/HelloWorld 11 hello world".to_vec()
        );
        assert_eq!(pae("", b""), b"DSSEv1 0  0 ".to_vec());
    }

    #[test]
    fn test_sign_envelope() {
        let signer = KeySigner::new(PrivateKey::from_pem(KEY.as_bytes()).unwrap()).unwrap();
        let key_id = signer.key_id().to_string();
        let signers: Vec<Box<dyn Signer>> = vec![Box::new(signer)];

        let envelope = sign_envelope(DEFAULT_PAYLOAD_TYPE, b"{}", &signers).unwrap();

        assert_eq!(envelope.payload, "e30=");
        assert_eq!(envelope.signatures.len(), 1);
        assert_eq!(envelope.signatures[0].keyid, key_id);
        assert_eq!(BASE64.decode(&envelope.signatures[0].sig).unwrap().len(), 64);
        assert!(envelope.signatures[0].certificate.is_none());

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["payloadType"], DEFAULT_PAYLOAD_TYPE);
        assert!(json["signatures"][0].get("certificate").is_none());
    }

    #[test]
    fn test_no_signers_yields_no_signatures() {
        let envelope = sign_envelope(DEFAULT_PAYLOAD_TYPE, b"x", &[]).unwrap();
        assert!(envelope.signatures.is_empty());
    }
}
