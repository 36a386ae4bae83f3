//! Key material loading.
//!
//! Access tokens are signed with a pre-generated asymmetric key pair read from
//! PEM files. Loading only checks that both files are configured and readable;
//! the PEM contents are parsed when a token is signed or verified, so a
//! malformed key surfaces as a signing or verification failure.
//!
//! ## Supported Algorithms
//!
//! - **RS256**: RSA with SHA-256 (default, widely compatible)
//! - **RS384**: RSA with SHA-384
//! - **ES384**: ECDSA with P-384 curve

use std::fmt;
use std::fs;
use std::path::Path;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use p384::elliptic_curve::sec1::ToEncodedPoint;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::AuthResult;
use crate::config::KeysConfig;
use crate::error::AuthError;

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// RSA with SHA-256.
    #[default]
    RS256,
    /// RSA with SHA-384.
    RS384,
    /// ECDSA with P-384 curve.
    ES384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Returns the algorithm name as used in JWK/JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::ES384 => "ES384",
        }
    }

    /// Returns `true` if this is an RSA-based algorithm.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Key Pair
// ============================================================================

/// Which half of the key pair a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// The verification key.
    Public,
    /// The signing key.
    Private,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// An asymmetric key pair held as raw PEM bytes.
///
/// Immutable once loaded. The pair is shared read-only (behind an `Arc`) by
/// the access token storage and the `token` response type of one server build.
#[derive(Clone)]
pub struct KeyPair {
    public_key: Vec<u8>,
    private_key: Vec<u8>,
    algorithm: SigningAlgorithm,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl KeyPair {
    /// Reads the key pair from the configured file paths.
    ///
    /// The public key is checked first. No caching is performed; callers that
    /// build servers repeatedly read the files on every call.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingKeyFile`] if either path is unset, the file
    /// does not exist, or it cannot be read.
    pub fn load(config: &KeysConfig) -> AuthResult<Self> {
        let public_key = read_key_file(KeyKind::Public, config.public_key.as_deref())?;
        let private_key = read_key_file(KeyKind::Private, config.private_key.as_deref())?;

        tracing::debug!(
            algorithm = %config.algorithm,
            public_key_bytes = public_key.len(),
            "Loaded token signing key pair"
        );

        Ok(Self {
            public_key,
            private_key,
            algorithm: config.algorithm,
        })
    }

    /// Builds a key pair from in-memory PEM data.
    #[must_use]
    pub fn from_pem(
        public_pem: impl Into<Vec<u8>>,
        private_pem: impl Into<Vec<u8>>,
        algorithm: SigningAlgorithm,
    ) -> Self {
        Self {
            public_key: public_pem.into(),
            private_key: private_pem.into(),
            algorithm,
        }
    }

    /// Returns the PEM-encoded public key.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Returns the PEM-encoded private key.
    #[must_use]
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Key ID derived from the public key (first 16 hex chars of its SHA-256).
    #[must_use]
    pub fn kid(&self) -> String {
        let digest = Sha256::digest(&self.public_key);
        hex::encode(&digest[..8])
    }

    /// Parses the private key for signing.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the PEM data is not a valid key for
    /// the configured algorithm.
    pub fn encoding_key(&self) -> AuthResult<EncodingKey> {
        let key = if self.algorithm.is_rsa() {
            EncodingKey::from_rsa_pem(&self.private_key)
        } else {
            EncodingKey::from_ec_pem(&self.private_key)
        };
        key.map_err(|e| AuthError::signing(format!("invalid private key: {e}")))
    }

    /// Parses the public key for verification.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the PEM data is not a valid key
    /// for the configured algorithm.
    pub fn decoding_key(&self) -> AuthResult<DecodingKey> {
        let key = if self.algorithm.is_rsa() {
            DecodingKey::from_rsa_pem(&self.public_key)
        } else {
            DecodingKey::from_ec_pem(&self.public_key)
        };
        key.map_err(|e| AuthError::configuration(format!("invalid public key: {e}")))
    }

    /// Exports the public key as a JWK, for publishing to resource servers.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the public key cannot be parsed.
    pub fn to_jwk(&self) -> AuthResult<Jwk> {
        let pem = std::str::from_utf8(&self.public_key)
            .map_err(|e| AuthError::configuration(format!("public key is not PEM: {e}")))?;

        if self.algorithm.is_rsa() {
            let public_key = RsaPublicKey::from_public_key_pem(pem)
                .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
                .map_err(|e| AuthError::configuration(format!("invalid RSA public key: {e}")))?;

            Ok(Jwk {
                kty: "RSA".to_string(),
                kid: self.kid(),
                use_: "sig".to_string(),
                alg: self.algorithm.as_str().to_string(),
                n: Some(URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be())),
                e: Some(URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be())),
                crv: None,
                x: None,
                y: None,
            })
        } else {
            let public_key = p384::PublicKey::from_public_key_pem(pem)
                .map_err(|e| AuthError::configuration(format!("invalid EC public key: {e}")))?;
            let point = public_key.to_encoded_point(false);
            let x = point
                .x()
                .ok_or_else(|| AuthError::configuration("Missing x coordinate"))?;
            let y = point
                .y()
                .ok_or_else(|| AuthError::configuration("Missing y coordinate"))?;

            Ok(Jwk {
                kty: "EC".to_string(),
                kid: self.kid(),
                use_: "sig".to_string(),
                alg: self.algorithm.as_str().to_string(),
                n: None,
                e: None,
                crv: Some("P-384".to_string()),
                x: Some(URL_SAFE_NO_PAD.encode(x)),
                y: Some(URL_SAFE_NO_PAD.encode(y)),
            })
        }
    }
}

fn read_key_file(kind: KeyKind, path: Option<&Path>) -> AuthResult<Vec<u8>> {
    let Some(path) = path else {
        return Err(AuthError::missing_key_file(kind, None));
    };

    if !path.exists() {
        return Err(AuthError::missing_key_file(kind, Some(path)));
    }

    fs::read(path).map_err(|e| {
        tracing::error!(key = %kind, path = %path.display(), error = %e, "Failed to read key file");
        AuthError::missing_key_file(kind, Some(path))
    })
}

// ============================================================================
// JWK
// ============================================================================

/// JSON Web Key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "EC").
    pub kty: String,

    /// Key ID.
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm.
    pub alg: String,

    /// RSA modulus (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// EC curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}
