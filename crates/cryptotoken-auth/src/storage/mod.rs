//! Storage capabilities of an OAuth2 server.
//!
//! An OAuth2 server consumes one storage surface split into capabilities:
//!
//! - access tokens
//! - authorization codes
//! - client credentials and client details
//! - refresh tokens
//! - user credentials
//! - scopes
//!
//! [`OAuthStorage`] carries the whole surface. Every method has a default body
//! that fails with [`AuthError::UnsupportedOperation`], so a backend only
//! implements the capabilities it actually stores and reports them through
//! [`OAuthStorage::supports`].
//!
//! # Implementations
//!
//! - [`MemoryStorage`] - in-process backend
//! - [`crate::token::JwtAccessTokenStorage`] - JWT access tokens over a legacy delegate
//! - `cryptotoken-auth-postgres` - PostgreSQL backend
//! - `cryptotoken-auth-mongo` - MongoDB backend

pub mod legacy;
pub mod memory;
pub mod types;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;

pub use legacy::LegacyStorage;
pub use memory::MemoryStorage;
pub use types::{AccessTokenRecord, AuthorizationCode, ClientDetails, RefreshTokenRecord, UserDetails};

/// A storage concern of the OAuth2 server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Access token issuance and lookup.
    AccessToken,
    /// Authorization codes.
    AuthorizationCode,
    /// Client secret verification.
    ClientCredentials,
    /// Client registration details.
    Client,
    /// Refresh tokens.
    RefreshToken,
    /// Resource owner credentials.
    UserCredentials,
    /// Scope definitions.
    Scope,
}

impl Capability {
    /// All capabilities, in a stable order.
    pub const ALL: [Capability; 7] = [
        Self::AccessToken,
        Self::AuthorizationCode,
        Self::ClientCredentials,
        Self::Client,
        Self::RefreshToken,
        Self::UserCredentials,
        Self::Scope,
    ];

    /// Returns the capability name used when registering storage on a server.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::Client => "client",
            Self::RefreshToken => "refresh_token",
            Self::UserCredentials => "user_credentials",
            Self::Scope => "scope",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AuthError::configuration(format!("unknown storage capability: {s}")))
    }
}

/// The conventional OAuth2 storage surface.
///
/// Methods are grouped by [`Capability`]. Backends override the groups they
/// support and return `true` from [`supports`](Self::supports) for them; the
/// remaining methods keep their default body, which fails with
/// [`AuthError::UnsupportedOperation`].
#[async_trait]
pub trait OAuthStorage: Send + Sync {
    /// Returns `true` if this backend stores the given capability.
    fn supports(&self, capability: Capability) -> bool;

    // -------------------------------------------------------------------------
    // access_token
    // -------------------------------------------------------------------------

    /// Looks up an access token. `None` if unknown or no longer valid.
    async fn get_access_token(&self, access_token: &str) -> AuthResult<Option<AccessTokenRecord>> {
        let _ = access_token;
        Err(AuthError::unsupported(Capability::AccessToken))
    }

    /// Stores an access token.
    async fn set_access_token(&self, token: &AccessTokenRecord) -> AuthResult<()> {
        let _ = token;
        Err(AuthError::unsupported(Capability::AccessToken))
    }

    /// Removes an access token. Returns `true` if one was removed.
    async fn unset_access_token(&self, access_token: &str) -> AuthResult<bool> {
        let _ = access_token;
        Err(AuthError::unsupported(Capability::AccessToken))
    }

    // -------------------------------------------------------------------------
    // authorization_code
    // -------------------------------------------------------------------------

    /// Looks up an authorization code.
    async fn get_authorization_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let _ = code;
        Err(AuthError::unsupported(Capability::AuthorizationCode))
    }

    /// Stores an authorization code.
    async fn set_authorization_code(&self, code: &AuthorizationCode) -> AuthResult<()> {
        let _ = code;
        Err(AuthError::unsupported(Capability::AuthorizationCode))
    }

    /// Consumes an authorization code so it cannot be exchanged again.
    async fn expire_authorization_code(&self, code: &str) -> AuthResult<()> {
        let _ = code;
        Err(AuthError::unsupported(Capability::AuthorizationCode))
    }

    // -------------------------------------------------------------------------
    // client_credentials
    // -------------------------------------------------------------------------

    /// Verifies a client secret. Public clients match a `None` secret.
    async fn check_client_credentials(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<bool> {
        let _ = (client_id, client_secret);
        Err(AuthError::unsupported(Capability::ClientCredentials))
    }

    /// Returns `true` if the client exists and has no secret.
    async fn is_public_client(&self, client_id: &str) -> AuthResult<bool> {
        let _ = client_id;
        Err(AuthError::unsupported(Capability::ClientCredentials))
    }

    // -------------------------------------------------------------------------
    // client
    // -------------------------------------------------------------------------

    /// Looks up a client registration.
    async fn get_client_details(&self, client_id: &str) -> AuthResult<Option<ClientDetails>> {
        let _ = client_id;
        Err(AuthError::unsupported(Capability::Client))
    }

    /// Returns the scope registered for a client, if any.
    async fn get_client_scope(&self, client_id: &str) -> AuthResult<Option<String>> {
        let _ = client_id;
        Err(AuthError::unsupported(Capability::Client))
    }

    /// Returns `true` if the client may use the grant type.
    async fn check_restricted_grant_type(
        &self,
        client_id: &str,
        grant_type: &str,
    ) -> AuthResult<bool> {
        let _ = (client_id, grant_type);
        Err(AuthError::unsupported(Capability::Client))
    }

    // -------------------------------------------------------------------------
    // refresh_token
    // -------------------------------------------------------------------------

    /// Looks up a refresh token.
    async fn get_refresh_token(&self, refresh_token: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let _ = refresh_token;
        Err(AuthError::unsupported(Capability::RefreshToken))
    }

    /// Stores a refresh token.
    async fn set_refresh_token(&self, token: &RefreshTokenRecord) -> AuthResult<()> {
        let _ = token;
        Err(AuthError::unsupported(Capability::RefreshToken))
    }

    /// Removes a refresh token.
    async fn unset_refresh_token(&self, refresh_token: &str) -> AuthResult<()> {
        let _ = refresh_token;
        Err(AuthError::unsupported(Capability::RefreshToken))
    }

    // -------------------------------------------------------------------------
    // user_credentials
    // -------------------------------------------------------------------------

    /// Verifies a resource owner's password.
    async fn check_user_credentials(&self, username: &str, password: &str) -> AuthResult<bool> {
        let _ = (username, password);
        Err(AuthError::unsupported(Capability::UserCredentials))
    }

    /// Looks up a resource owner.
    async fn get_user_details(&self, username: &str) -> AuthResult<Option<UserDetails>> {
        let _ = username;
        Err(AuthError::unsupported(Capability::UserCredentials))
    }

    // -------------------------------------------------------------------------
    // scope
    // -------------------------------------------------------------------------

    /// Returns `true` if every space-separated scope in `scope` is defined.
    async fn scope_exists(&self, scope: &str) -> AuthResult<bool> {
        let _ = scope;
        Err(AuthError::unsupported(Capability::Scope))
    }

    /// Returns the default scope, optionally for a specific client.
    async fn get_default_scope(&self, client_id: Option<&str>) -> AuthResult<Option<String>> {
        let _ = client_id;
        Err(AuthError::unsupported(Capability::Scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScopesOnly;

    #[async_trait]
    impl OAuthStorage for ScopesOnly {
        fn supports(&self, capability: Capability) -> bool {
            capability == Capability::Scope
        }

        async fn scope_exists(&self, scope: &str) -> AuthResult<bool> {
            Ok(scope == "read")
        }
    }

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::AccessToken.as_str(), "access_token");
        assert_eq!(Capability::UserCredentials.to_string(), "user_credentials");
        for capability in Capability::ALL {
            assert_eq!(capability.as_str().parse::<Capability>().unwrap(), capability);
        }
        assert!("carrier_pigeon".parse::<Capability>().is_err());
    }

    #[tokio::test]
    async fn test_default_methods_are_unsupported() {
        let storage = ScopesOnly;
        assert!(storage.scope_exists("read").await.unwrap());

        let err = storage.get_client_details("abc").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::UnsupportedOperation {
                capability: Capability::Client
            }
        ));

        let err = storage.unset_refresh_token("abc").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::UnsupportedOperation {
                capability: Capability::RefreshToken
            }
        ));
    }
}
