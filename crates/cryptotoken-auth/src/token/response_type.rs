//! Token endpoint response types.
//!
//! A response type turns a granted request into the JSON body returned from
//! the token endpoint. [`JwtAccessTokenResponseType`] signs a JWT access
//! token and, when asked and a refresh token store is available, issues an
//! opaque refresh token alongside it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::TokenConfig;
use crate::keys::KeyPair;
use crate::secret::generate_opaque_token;
use crate::storage::{Capability, LegacyStorage, OAuthStorage, RefreshTokenRecord};
use crate::token::jwt::JwtAccessTokenStorage;

/// Name under which access token response types are registered.
pub const TOKEN_RESPONSE_TYPE: &str = "token";

/// A granted request for an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessTokenRequest {
    /// Client the token is issued to.
    pub client_id: String,
    /// Resource owner, absent for client credentials grants.
    pub user_id: Option<String>,
    /// Granted scope.
    pub scope: Option<String>,
    /// Also issue a refresh token.
    pub include_refresh_token: bool,
}

impl AccessTokenRequest {
    /// Creates a request for a client with no user, scope or refresh token.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self) -> Self {
        self.include_refresh_token = true;
        self
    }
}

/// Token endpoint response body (RFC 6749 section 5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Refresh token, when one was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Produces token endpoint responses.
#[async_trait]
pub trait ResponseType: Send + Sync {
    /// The response type name the server registers this under.
    fn response_type(&self) -> &'static str;

    /// Issues an access token for a granted request.
    async fn create_access_token(&self, request: &AccessTokenRequest) -> AuthResult<TokenResponse>;
}

/// Response type issuing JWT access tokens.
///
/// Holds its own [`JwtAccessTokenStorage`] over the same key pair and legacy
/// delegate as the storage registered on the server.
#[derive(Debug, Clone)]
pub struct JwtAccessTokenResponseType {
    storage: JwtAccessTokenStorage,
    access_lifetime: Duration,
    refresh_token_lifetime: Duration,
}

impl JwtAccessTokenResponseType {
    /// Creates the response type.
    #[must_use]
    pub fn new(keys: Arc<KeyPair>, delegate: Option<LegacyStorage>, config: &TokenConfig) -> Self {
        Self {
            storage: JwtAccessTokenStorage::new(keys, delegate).with_issuer(config.issuer.clone()),
            access_lifetime: config.access_lifetime,
            refresh_token_lifetime: config.refresh_token_lifetime,
        }
    }

    /// The storage used to sign tokens.
    #[must_use]
    pub fn storage(&self) -> &JwtAccessTokenStorage {
        &self.storage
    }

    /// Access token lifetime.
    #[must_use]
    pub fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }

    async fn issue_refresh_token(&self, request: &AccessTokenRequest) -> AuthResult<Option<String>> {
        if !self.storage.supports(Capability::RefreshToken) {
            tracing::debug!(
                client_id = %request.client_id,
                "Refresh token requested but no refresh token storage is configured"
            );
            return Ok(None);
        }

        let lifetime = i64::try_from(self.refresh_token_lifetime.as_secs()).unwrap_or(i64::MAX);
        let record = RefreshTokenRecord {
            refresh_token: generate_opaque_token(),
            client_id: request.client_id.clone(),
            user_id: request.user_id.clone(),
            expires: OffsetDateTime::now_utc()
                .unix_timestamp()
                .saturating_add(lifetime),
            scope: request.scope.clone(),
        };
        self.storage.set_refresh_token(&record).await?;
        Ok(Some(record.refresh_token))
    }
}

#[async_trait]
impl ResponseType for JwtAccessTokenResponseType {
    fn response_type(&self) -> &'static str {
        TOKEN_RESPONSE_TYPE
    }

    async fn create_access_token(&self, request: &AccessTokenRequest) -> AuthResult<TokenResponse> {
        let access_token = self.storage.issue(
            &request.client_id,
            request.user_id.as_deref(),
            request.scope.as_deref(),
            self.access_lifetime,
        )?;

        let refresh_token = if request.include_refresh_token {
            self.issue_refresh_token(request).await?
        } else {
            None
        };

        tracing::debug!(
            client_id = %request.client_id,
            refresh = refresh_token.is_some(),
            "Issued JWT access token"
        );

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_lifetime.as_secs(),
            scope: request.scope.clone().filter(|s| !s.is_empty()),
            refresh_token,
        })
    }
}
