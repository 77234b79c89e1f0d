//! Webhook signature verification (HMAC-SHA256 over the raw body).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid signature encoding")]
    InvalidEncoding,
    #[error("Webhook signature mismatch")]
    Mismatch,
}

/// Verify a hex-encoded HMAC-SHA256 signature over the raw request body.
///
/// The comparison is constant time via `Mac::verify_slice`.
pub fn verify_signature(
    payload: &[u8],
    signature_hex: &str,
    secret: &str,
) -> Result<(), SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidEncoding)?;
    mac.update(payload);

    let signature =
        hex::decode(signature_hex.trim()).map_err(|_| SignatureError::InvalidEncoding)?;
    mac.verify_slice(&signature)
        .map_err(|_| SignatureError::Mismatch)
}

/// Sign a payload the way the platform does. Used by clients and tests.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let payload = br#"{"id":"820982911946154508"}"#;
        let signature = sign_payload(payload, "secret");
        assert!(verify_signature(payload, &signature, "secret").is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signature = sign_payload(b"original", "secret");
        assert_eq!(
            verify_signature(b"tampered", &signature, "secret"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signature = sign_payload(b"payload", "secret");
        assert_eq!(
            verify_signature(b"payload", &signature, "other"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert_eq!(
            verify_signature(b"payload", "not hex!", "secret"),
            Err(SignatureError::InvalidEncoding)
        );
    }
}
