//! In-process storage backend.
//!
//! Holds every capability in `tokio` locked maps. Used for tests, local
//! development and as a registered service in single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::types::{is_expired, scope_parts};
use super::{
    AccessTokenRecord, AuthorizationCode, Capability, ClientDetails, OAuthStorage,
    RefreshTokenRecord, UserDetails,
};
use crate::AuthResult;
use crate::secret::verify_stored_password;

#[derive(Debug, Clone)]
struct StoredUser {
    details: UserDetails,
    password: String,
}

#[derive(Debug, Clone)]
struct StoredScope {
    is_default: bool,
}

/// Storage backed by in-memory maps.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    clients: RwLock<HashMap<String, ClientDetails>>,
    access_tokens: RwLock<HashMap<String, AccessTokenRecord>>,
    refresh_tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
    codes: RwLock<HashMap<String, AuthorizationCode>>,
    users: RwLock<HashMap<String, StoredUser>>,
    scopes: RwLock<HashMap<String, StoredScope>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client.
    #[must_use]
    pub fn with_client(mut self, client: ClientDetails) -> Self {
        self.clients
            .get_mut()
            .insert(client.client_id.clone(), client);
        self
    }

    /// Adds a user. `password` may be plain text or an Argon2 PHC hash.
    #[must_use]
    pub fn with_user(mut self, details: UserDetails, password: impl Into<String>) -> Self {
        let user = StoredUser {
            details,
            password: password.into(),
        };
        self.users
            .get_mut()
            .insert(user.details.username.clone(), user);
        self
    }

    /// Adds a scope definition.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>, is_default: bool) -> Self {
        self.scopes
            .get_mut()
            .insert(scope.into(), StoredScope { is_default });
        self
    }

    /// Number of stored access tokens.
    pub async fn access_token_count(&self) -> usize {
        self.access_tokens.read().await.len()
    }

    /// Number of stored refresh tokens.
    pub async fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.read().await.len()
    }
}

#[async_trait]
impl OAuthStorage for MemoryStorage {
    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    async fn get_access_token(&self, access_token: &str) -> AuthResult<Option<AccessTokenRecord>> {
        Ok(self.access_tokens.read().await.get(access_token).cloned())
    }

    async fn set_access_token(&self, token: &AccessTokenRecord) -> AuthResult<()> {
        self.access_tokens
            .write()
            .await
            .insert(token.access_token.clone(), token.clone());
        Ok(())
    }

    async fn unset_access_token(&self, access_token: &str) -> AuthResult<bool> {
        Ok(self.access_tokens.write().await.remove(access_token).is_some())
    }

    async fn get_authorization_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let codes = self.codes.read().await;
        Ok(codes.get(code).filter(|c| !c.is_expired()).cloned())
    }

    async fn set_authorization_code(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes
            .write()
            .await
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn expire_authorization_code(&self, code: &str) -> AuthResult<()> {
        self.codes.write().await.remove(code);
        Ok(())
    }

    async fn check_client_credentials(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<bool> {
        Ok(self
            .clients
            .read()
            .await
            .get(client_id)
            .is_some_and(|client| client.verify_secret(client_secret)))
    }

    async fn is_public_client(&self, client_id: &str) -> AuthResult<bool> {
        Ok(self
            .clients
            .read()
            .await
            .get(client_id)
            .is_some_and(ClientDetails::is_public))
    }

    async fn get_client_details(&self, client_id: &str) -> AuthResult<Option<ClientDetails>> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }

    async fn get_client_scope(&self, client_id: &str) -> AuthResult<Option<String>> {
        Ok(self
            .clients
            .read()
            .await
            .get(client_id)
            .and_then(|client| client.scope.clone()))
    }

    async fn check_restricted_grant_type(
        &self,
        client_id: &str,
        grant_type: &str,
    ) -> AuthResult<bool> {
        Ok(self
            .clients
            .read()
            .await
            .get(client_id)
            .is_none_or(|client| client.allows_grant_type(grant_type)))
    }

    async fn get_refresh_token(&self, refresh_token: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        Ok(self
            .refresh_tokens
            .read()
            .await
            .get(refresh_token)
            .filter(|token| !is_expired(token.expires))
            .cloned())
    }

    async fn set_refresh_token(&self, token: &RefreshTokenRecord) -> AuthResult<()> {
        self.refresh_tokens
            .write()
            .await
            .insert(token.refresh_token.clone(), token.clone());
        Ok(())
    }

    async fn unset_refresh_token(&self, refresh_token: &str) -> AuthResult<()> {
        self.refresh_tokens.write().await.remove(refresh_token);
        Ok(())
    }

    async fn check_user_credentials(&self, username: &str, password: &str) -> AuthResult<bool> {
        match self.users.read().await.get(username) {
            Some(user) => verify_stored_password(password, &user.password),
            None => Ok(false),
        }
    }

    async fn get_user_details(&self, username: &str) -> AuthResult<Option<UserDetails>> {
        Ok(self
            .users
            .read()
            .await
            .get(username)
            .map(|user| user.details.clone()))
    }

    async fn scope_exists(&self, scope: &str) -> AuthResult<bool> {
        let scopes = self.scopes.read().await;
        Ok(scope_parts(scope).iter().all(|part| scopes.contains_key(*part)))
    }

    async fn get_default_scope(&self, _client_id: Option<&str>) -> AuthResult<Option<String>> {
        let scopes = self.scopes.read().await;
        let mut defaults: Vec<&str> = scopes
            .iter()
            .filter(|(_, scope)| scope.is_default)
            .map(|(name, _)| name.as_str())
            .collect();
        if defaults.is_empty() {
            return Ok(None);
        }
        defaults.sort_unstable();
        Ok(Some(defaults.join(" ")))
    }
}
