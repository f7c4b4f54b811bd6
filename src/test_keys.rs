//! RSA key pairs shared by unit tests.

use std::sync::OnceLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::pkcs8::EncodePublicKey as _;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest as _, Sha1};

/// A generated key pair with its base64 public key.
pub(crate) struct TestKeys {
    /// Private half used to sign payloads.
    private: RsaPrivateKey,
    /// Base64 `SubjectPublicKeyInfo` of the public half.
    public_base64: String,
}

impl TestKeys {
    /// Generates a fresh 1024-bit key pair.
    fn generate() -> Self {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let der = private.to_public_key().to_public_key_der().unwrap();
        let public_base64 = BASE64.encode(der.as_bytes());
        Self {
            private,
            public_base64,
        }
    }

    /// Signs `payload` the way the vendor does and returns base64.
    pub(crate) fn sign(&self, payload: &str) -> String {
        let digest = Sha1::digest(payload.as_bytes());
        let signature = self
            .private
            .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
            .unwrap();
        BASE64.encode(signature)
    }

    /// Base64 public key.
    pub(crate) fn public_key(&self) -> &str {
        &self.public_base64
    }
}

/// Primary test key pair.
pub(crate) fn keys() -> &'static TestKeys {
    static KEYS: OnceLock<TestKeys> = OnceLock::new();
    KEYS.get_or_init(TestKeys::generate)
}

/// A second, unrelated key pair.
pub(crate) fn other_keys() -> &'static TestKeys {
    static KEYS: OnceLock<TestKeys> = OnceLock::new();
    KEYS.get_or_init(TestKeys::generate)
}
