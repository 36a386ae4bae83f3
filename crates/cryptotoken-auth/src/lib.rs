//! # cryptotoken-auth
//!
//! JWT access tokens for an OAuth2 server.
//!
//! Access tokens are signed with a pre-generated key pair instead of being
//! stored, so any holder of the public key can verify them. Every other
//! storage concern of the server (clients, codes, refresh tokens, users,
//! scopes) keeps working against the deployment's existing storage, which
//! the JWT storage forwards to.
//!
//! ## Modules
//!
//! - [`config`] - key, token and per-route storage configuration
//! - [`keys`] - key pair loading and JWK export
//! - [`storage`] - the storage capability surface and in-process backend
//! - [`token`] - JWT access token storage and response type
//! - [`server`] - the server-build collaborator traits
//! - [`secret`] - password hashing and opaque token generation

pub mod config;
pub mod error;
pub mod keys;
pub mod secret;
pub mod server;
pub mod storage;
pub mod token;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{
    AdapterConfig, AuthAdapterConfig, AuthenticationConfig, ConfigError, CryptoTokenConfig,
    DEFAULT_MONGO_LOCATOR, KeysConfig, MongoConfig, PdoConfig, StorageBlock, StorageConfig,
    StorageRefs, StorageSettings, TokenConfig,
};
pub use error::{AuthError, ErrorCategory};
pub use keys::{Jwk, KeyKind, KeyPair, SigningAlgorithm};
pub use server::{BasicOAuthServer, OAuthServer, ServerFactory, ServerFn};
pub use storage::{
    AccessTokenRecord, AuthorizationCode, Capability, ClientDetails, LegacyStorage,
    MemoryStorage, OAuthStorage, RefreshTokenRecord, UserDetails,
};
pub use token::{
    AccessTokenRequest, JwtAccessTokenClaims, JwtAccessTokenResponseType, JwtAccessTokenStorage,
    ResponseType, TokenResponse,
};

/// Type alias for results in this crate.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use cryptotoken_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{CryptoTokenConfig, StorageConfig, TokenConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::keys::{KeyPair, SigningAlgorithm};
    pub use crate::server::{OAuthServer, ServerFactory};
    pub use crate::storage::{Capability, LegacyStorage, OAuthStorage};
    pub use crate::token::{
        AccessTokenRequest, JwtAccessTokenResponseType, JwtAccessTokenStorage, ResponseType,
        TokenResponse,
    };
}
