//! Purchase signature verification.
//!
//! The vendor signs each purchase-data blob with the application's RSA key
//! (PKCS#1 v1.5 over SHA-1). The public half is distributed as a base64
//! X.509 `SubjectPublicKeyInfo`; signatures arrive base64-encoded.
//!
//! Verification fails closed: empty inputs, bad base64 and mismatches all
//! yield `false`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest as _, Sha1};

use crate::error::{KinAppError, Result};

/// Verifies purchase signatures against one decoded public key.
///
/// Decode the key once and reuse the verifier; it is cheap to clone and
/// safe to share between threads.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    /// Decoded RSA public key.
    key: RsaPublicKey,
}

impl SignatureVerifier {
    /// Decodes a base64 `SubjectPublicKeyInfo` public key.
    ///
    /// # Errors
    ///
    /// Returns [`KinAppError::InvalidKey`] if the text is not base64 or the
    /// decoded bytes are not an RSA public key.
    #[inline]
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let der = BASE64
            .decode(encoded.trim())
            .map_err(|err| KinAppError::InvalidKey(err.to_string()))?;
        Self::from_der(&der)
    }

    /// Decodes a DER `SubjectPublicKeyInfo` public key.
    ///
    /// # Errors
    ///
    /// Returns [`KinAppError::InvalidKey`] if the bytes are not an RSA public
    /// key.
    #[inline]
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|err| KinAppError::InvalidKey(err.to_string()))?;
        Ok(Self { key })
    }

    /// Returns `true` if `signature` (base64) is a valid signature of
    /// `payload` under this key.
    #[must_use]
    pub fn verify(&self, payload: &str, signature: &str) -> bool {
        if payload.is_empty() || signature.is_empty() {
            tracing::debug!("empty payload or signature");
            return false;
        }
        let raw_signature = match BASE64.decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "signature is not valid base64");
                return false;
            }
        };
        let digest = Sha1::digest(payload.as_bytes());
        match self
            .key
            .verify(Pkcs1v15Sign::new::<Sha1>(), &digest, &raw_signature)
        {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "signature mismatch");
                false
            }
        }
    }
}

/// One-shot verification with a base64 public key.
///
/// Any failure, including an undecodable key, yields `false`.
#[must_use]
pub fn verify_signature(payload: &str, signature: &str, public_key: &str) -> bool {
    if public_key.is_empty() {
        tracing::warn!("no public key configured");
        return false;
    }
    match SignatureVerifier::from_base64(public_key) {
        Ok(verifier) => verifier.verify(payload, signature),
        Err(err) => {
            tracing::warn!(error = %err, "cannot verify signature");
            false
        }
    }
}
