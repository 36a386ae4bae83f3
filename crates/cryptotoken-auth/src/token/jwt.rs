//! Self-contained JWT access tokens.
//!
//! [`JwtAccessTokenStorage`] implements the access token capability by
//! signing tokens with the configured private key and verifying them with the
//! public key, so issued tokens are never persisted. Every other capability
//! is forwarded unchanged to an optional [`LegacyStorage`] delegate.
//!
//! ## Verification
//!
//! Retrieval checks the signature, the algorithm, the expiry (no leeway) and,
//! when an issuer is configured, the `iss` claim. A token failing any check is
//! reported as not found rather than as an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::keys::KeyPair;
use crate::storage::{
    AccessTokenRecord, AuthorizationCode, Capability, ClientDetails, LegacyStorage, OAuthStorage,
    RefreshTokenRecord, UserDetails,
};

/// Token type carried in the `token_type` claim.
pub const BEARER_TOKEN_TYPE: &str = "bearer";

// ============================================================================
// Claims
// ============================================================================

/// Claims of a JWT access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtAccessTokenClaims {
    /// Unique token id.
    pub jti: String,

    /// Issuer, omitted when none is configured.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iss: String,

    /// Audience, the client the token was issued to.
    pub aud: String,

    /// Resource owner, absent for client credentials grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Client the token was issued to.
    pub client_id: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Always `bearer`.
    pub token_type: String,

    /// Space-separated granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl JwtAccessTokenClaims {
    /// Builds claims for a token issued now.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        user_id: Option<&str>,
        scope: Option<&str>,
        expires_in: Duration,
    ) -> Self {
        let client_id = client_id.into();
        let iat = OffsetDateTime::now_utc().unix_timestamp();
        let lifetime = i64::try_from(expires_in.as_secs()).unwrap_or(i64::MAX);
        Self {
            jti: uuid::Uuid::new_v4().to_string(),
            iss: issuer.into(),
            aud: client_id.clone(),
            sub: user_id.map(str::to_string),
            client_id,
            exp: iat.saturating_add(lifetime),
            iat,
            token_type: BEARER_TOKEN_TYPE.to_string(),
            scope: scope.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    /// Converts verified claims into the record handed to the server.
    #[must_use]
    pub fn into_record(self, access_token: impl Into<String>) -> AccessTokenRecord {
        AccessTokenRecord {
            access_token: access_token.into(),
            client_id: self.client_id,
            user_id: self.sub,
            expires: self.exp,
            scope: self.scope,
            jti: Some(self.jti),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Access token storage that issues and verifies signed JWTs.
///
/// Capabilities other than access tokens are delegated to the legacy storage
/// given at construction, with arguments and results passed through as is.
#[derive(Debug, Clone)]
pub struct JwtAccessTokenStorage {
    keys: Arc<KeyPair>,
    delegate: Option<LegacyStorage>,
    issuer: String,
}

impl JwtAccessTokenStorage {
    /// Creates the storage from a key pair and an optional legacy delegate.
    #[must_use]
    pub fn new(keys: Arc<KeyPair>, delegate: Option<LegacyStorage>) -> Self {
        Self {
            keys,
            delegate,
            issuer: String::new(),
        }
    }

    /// Sets the issuer written to and checked against the `iss` claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// The key pair tokens are signed with.
    #[must_use]
    pub fn key_pair(&self) -> &Arc<KeyPair> {
        &self.keys
    }

    /// The legacy delegate, if one was configured.
    #[must_use]
    pub fn delegate(&self) -> Option<&LegacyStorage> {
        self.delegate.as_ref()
    }

    /// The configured issuer, empty if none.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signs a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the private key cannot be used.
    pub fn issue(
        &self,
        client_id: &str,
        user_id: Option<&str>,
        scope: Option<&str>,
        expires_in: Duration,
    ) -> AuthResult<String> {
        let claims =
            JwtAccessTokenClaims::new(self.issuer.clone(), client_id, user_id, scope, expires_in);
        self.encode_claims(&claims)
    }

    /// Signs arbitrary access token claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the private key cannot be used.
    pub fn encode_claims(&self, claims: &JwtAccessTokenClaims) -> AuthResult<String> {
        let mut header = Header::new(self.keys.algorithm().to_jwt_algorithm());
        header.kid = Some(self.keys.kid());

        let key = self.keys.encoding_key()?;
        encode(&header, claims, &key).map_err(|e| AuthError::signing(e.to_string()))
    }

    /// Verifies a token and returns its record.
    ///
    /// Returns `Ok(None)` for malformed, forged, expired or foreign tokens.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the public key cannot be parsed.
    pub fn retrieve(&self, access_token: &str) -> AuthResult<Option<AccessTokenRecord>> {
        let key = self.keys.decoding_key()?;

        let mut validation = Validation::new(self.keys.algorithm().to_jwt_algorithm());
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        if !self.issuer.is_empty() {
            validation.set_issuer(&[&self.issuer]);
        }

        match decode::<JwtAccessTokenClaims>(access_token, &key, &validation) {
            Ok(data) => Ok(Some(data.claims.into_record(access_token))),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected access token");
                Ok(None)
            }
        }
    }

    fn delegate_for(&self, capability: Capability) -> AuthResult<&Arc<dyn OAuthStorage>> {
        self.delegate
            .as_ref()
            .and_then(|delegate| delegate.route(capability))
            .ok_or_else(|| AuthError::unsupported(capability))
    }
}

#[async_trait]
impl OAuthStorage for JwtAccessTokenStorage {
    fn supports(&self, capability: Capability) -> bool {
        capability == Capability::AccessToken
            || self
                .delegate
                .as_ref()
                .is_some_and(|delegate| delegate.supports(capability))
    }

    async fn get_access_token(&self, access_token: &str) -> AuthResult<Option<AccessTokenRecord>> {
        self.retrieve(access_token)
    }

    // Issued tokens are self-contained; nothing to persist.
    async fn set_access_token(&self, _token: &AccessTokenRecord) -> AuthResult<()> {
        Ok(())
    }

    // Signed tokens stay valid until they expire.
    async fn unset_access_token(&self, _access_token: &str) -> AuthResult<bool> {
        Ok(false)
    }

    async fn get_authorization_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        self.delegate_for(Capability::AuthorizationCode)?
            .get_authorization_code(code)
            .await
    }

    async fn set_authorization_code(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.delegate_for(Capability::AuthorizationCode)?
            .set_authorization_code(code)
            .await
    }

    async fn expire_authorization_code(&self, code: &str) -> AuthResult<()> {
        self.delegate_for(Capability::AuthorizationCode)?
            .expire_authorization_code(code)
            .await
    }

    async fn check_client_credentials(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<bool> {
        self.delegate_for(Capability::ClientCredentials)?
            .check_client_credentials(client_id, client_secret)
            .await
    }

    async fn is_public_client(&self, client_id: &str) -> AuthResult<bool> {
        self.delegate_for(Capability::ClientCredentials)?
            .is_public_client(client_id)
            .await
    }

    async fn get_client_details(&self, client_id: &str) -> AuthResult<Option<ClientDetails>> {
        self.delegate_for(Capability::Client)?
            .get_client_details(client_id)
            .await
    }

    async fn get_client_scope(&self, client_id: &str) -> AuthResult<Option<String>> {
        self.delegate_for(Capability::Client)?
            .get_client_scope(client_id)
            .await
    }

    async fn check_restricted_grant_type(
        &self,
        client_id: &str,
        grant_type: &str,
    ) -> AuthResult<bool> {
        self.delegate_for(Capability::Client)?
            .check_restricted_grant_type(client_id, grant_type)
            .await
    }

    async fn get_refresh_token(&self, refresh_token: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        self.delegate_for(Capability::RefreshToken)?
            .get_refresh_token(refresh_token)
            .await
    }

    async fn set_refresh_token(&self, token: &RefreshTokenRecord) -> AuthResult<()> {
        self.delegate_for(Capability::RefreshToken)?
            .set_refresh_token(token)
            .await
    }

    async fn unset_refresh_token(&self, refresh_token: &str) -> AuthResult<()> {
        self.delegate_for(Capability::RefreshToken)?
            .unset_refresh_token(refresh_token)
            .await
    }

    async fn check_user_credentials(&self, username: &str, password: &str) -> AuthResult<bool> {
        self.delegate_for(Capability::UserCredentials)?
            .check_user_credentials(username, password)
            .await
    }

    async fn get_user_details(&self, username: &str) -> AuthResult<Option<UserDetails>> {
        self.delegate_for(Capability::UserCredentials)?
            .get_user_details(username)
            .await
    }

    async fn scope_exists(&self, scope: &str) -> AuthResult<bool> {
        self.delegate_for(Capability::Scope)?
            .scope_exists(scope)
            .await
    }

    async fn get_default_scope(&self, client_id: Option<&str>) -> AuthResult<Option<String>> {
        self.delegate_for(Capability::Scope)?
            .get_default_scope(client_id)
            .await
    }
}
