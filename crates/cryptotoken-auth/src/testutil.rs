//! Key material and helpers shared by unit tests.

use std::path::Path;

use p384::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;

use crate::config::KeysConfig;
use crate::keys::{KeyPair, SigningAlgorithm};

/// A freshly generated PEM key pair.
pub struct TestKeys {
    pub public_pem: String,
    pub private_pem: String,
    pub algorithm: SigningAlgorithm,
}

impl TestKeys {
    /// ES384 keys. Cheap to generate, used by most tests.
    pub fn ec() -> Self {
        let secret = p384::SecretKey::random(&mut OsRng);
        let private_pem = secret.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = secret.public_key().to_public_key_pem(LineEnding::LF).unwrap();
        Self {
            public_pem,
            private_pem,
            algorithm: SigningAlgorithm::ES384,
        }
    }

    /// RS256 keys.
    pub fn rsa() -> Self {
        let private = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let private_pem = rsa::pkcs8::EncodePrivateKey::to_pkcs8_pem(&private, LineEnding::LF)
            .unwrap()
            .to_string();
        let public_pem =
            rsa::pkcs8::EncodePublicKey::to_public_key_pem(&private.to_public_key(), LineEnding::LF)
                .unwrap();
        Self {
            public_pem,
            private_pem,
            algorithm: SigningAlgorithm::RS256,
        }
    }

    pub fn key_pair(&self) -> KeyPair {
        KeyPair::from_pem(
            self.public_pem.as_bytes(),
            self.private_pem.as_bytes(),
            self.algorithm,
        )
    }
}

/// Writes both keys to `dir` and returns a config pointing at them.
pub fn write_key_files(dir: &Path, keys: &TestKeys) -> KeysConfig {
    let public = dir.join("public.pem");
    let private = dir.join("private.pem");
    std::fs::write(&public, &keys.public_pem).unwrap();
    std::fs::write(&private, &keys.private_pem).unwrap();
    KeysConfig {
        public_key: Some(public),
        private_key: Some(private),
        algorithm: keys.algorithm,
    }
}
