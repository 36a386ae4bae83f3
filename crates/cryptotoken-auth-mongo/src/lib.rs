//! MongoDB storage backend for cryptotoken-auth.
//!
//! Implements the conventional OAuth2 storage surface over six collections
//! named by [`StorageSettings`]. Documents use the same field names as the
//! relational columns; expiry is stored as Unix seconds.
//!
//! Clients never connect eagerly: the driver opens connections on the first
//! operation.

pub mod connect;
mod documents;

use async_trait::async_trait;
use cryptotoken_auth::AuthResult;
use cryptotoken_auth::config::{MongoConfig, StorageSettings};
use cryptotoken_auth::error::AuthError;
use cryptotoken_auth::secret::verify_stored_password;
use cryptotoken_auth::storage::types::{is_expired, scope_parts};
use cryptotoken_auth::storage::{
    AccessTokenRecord, AuthorizationCode, Capability, ClientDetails, OAuthStorage,
    RefreshTokenRecord, UserDetails,
};
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};

use documents::{ScopeDocument, UserDocument};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Driver operation failed.
    #[error("MongoDB error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// No database name was configured.
    #[error("Missing MongoDB database name")]
    MissingDatabase,

    /// A driver option has the wrong type.
    #[error("Invalid option '{key}': {message}")]
    InvalidOption {
        /// Option name.
        key: String,
        /// What was wrong with it.
        message: String,
    },
}

impl StorageError {
    /// Create an `InvalidOption` error.
    #[must_use]
    pub fn invalid_option(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingDatabase => AuthError::MissingDatabaseConfig,
            StorageError::InvalidOption { .. } => AuthError::configuration(err.to_string()),
            StorageError::Driver(_) => AuthError::storage(err.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// MongoDB Storage
// =============================================================================

/// MongoDB storage backend.
#[derive(Debug, Clone)]
pub struct MongoStorage {
    db: Database,
    settings: StorageSettings,
}

impl MongoStorage {
    /// Create storage over an existing database handle.
    #[must_use]
    pub fn new(db: Database, settings: StorageSettings) -> Self {
        Self { db, settings }
    }

    /// Create storage with a new lazily connecting client.
    ///
    /// # Errors
    ///
    /// - [`StorageError::MissingDatabase`] if no database name is configured
    /// - [`StorageError::Driver`] if the connection string cannot be parsed
    pub async fn connect(config: &MongoConfig) -> StorageResult<Self> {
        let database = config
            .database
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or(StorageError::MissingDatabase)?;
        let db = connect::database(config.dsn.as_deref(), &config.options, database).await?;
        Ok(Self::new(db, config.settings.clone()))
    }

    /// The database handle.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Collection names in use.
    #[must_use]
    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    fn clients(&self) -> Collection<ClientDetails> {
        self.db.collection(&self.settings.client_table)
    }

    fn access_tokens(&self) -> Collection<AccessTokenRecord> {
        self.db.collection(&self.settings.access_token_table)
    }

    fn refresh_tokens(&self) -> Collection<RefreshTokenRecord> {
        self.db.collection(&self.settings.refresh_token_table)
    }

    fn codes(&self) -> Collection<AuthorizationCode> {
        self.db.collection(&self.settings.code_table)
    }

    fn users(&self) -> Collection<UserDocument> {
        self.db.collection(&self.settings.user_table)
    }

    fn scopes(&self) -> Collection<ScopeDocument> {
        self.db.collection(&self.settings.scope_table)
    }

    async fn find_client(&self, client_id: &str) -> StorageResult<Option<ClientDetails>> {
        Ok(self
            .clients()
            .find_one(doc! { "client_id": client_id })
            .await?)
    }
}

#[async_trait]
impl OAuthStorage for MongoStorage {
    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    async fn get_access_token(&self, access_token: &str) -> AuthResult<Option<AccessTokenRecord>> {
        let token = self
            .access_tokens()
            .find_one(doc! { "access_token": access_token })
            .await
            .map_err(StorageError::from)?;
        Ok(token)
    }

    async fn set_access_token(&self, token: &AccessTokenRecord) -> AuthResult<()> {
        self.access_tokens()
            .replace_one(doc! { "access_token": token.access_token.as_str() }, token)
            .upsert(true)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn unset_access_token(&self, access_token: &str) -> AuthResult<bool> {
        let result = self
            .access_tokens()
            .delete_one(doc! { "access_token": access_token })
            .await
            .map_err(StorageError::from)?;
        Ok(result.deleted_count > 0)
    }

    async fn get_authorization_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let code = self
            .codes()
            .find_one(doc! { "authorization_code": code })
            .await
            .map_err(StorageError::from)?;
        Ok(code.filter(|c| !c.is_expired()))
    }

    async fn set_authorization_code(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes()
            .replace_one(doc! { "authorization_code": code.code.as_str() }, code)
            .upsert(true)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn expire_authorization_code(&self, code: &str) -> AuthResult<()> {
        self.codes()
            .delete_one(doc! { "authorization_code": code })
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn check_client_credentials(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<bool> {
        let client = self.find_client(client_id).await?;
        Ok(client.is_some_and(|c| c.verify_secret(client_secret)))
    }

    async fn is_public_client(&self, client_id: &str) -> AuthResult<bool> {
        let client = self.find_client(client_id).await?;
        Ok(client.is_some_and(|c| c.is_public()))
    }

    async fn get_client_details(&self, client_id: &str) -> AuthResult<Option<ClientDetails>> {
        Ok(self.find_client(client_id).await?)
    }

    async fn get_client_scope(&self, client_id: &str) -> AuthResult<Option<String>> {
        let client = self.find_client(client_id).await?;
        Ok(client.and_then(|c| c.scope))
    }

    async fn check_restricted_grant_type(
        &self,
        client_id: &str,
        grant_type: &str,
    ) -> AuthResult<bool> {
        let client = self.find_client(client_id).await?;
        Ok(client.is_none_or(|c| c.allows_grant_type(grant_type)))
    }

    async fn get_refresh_token(&self, refresh_token: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let token = self
            .refresh_tokens()
            .find_one(doc! { "refresh_token": refresh_token })
            .await
            .map_err(StorageError::from)?;
        Ok(token.filter(|t| !is_expired(t.expires)))
    }

    async fn set_refresh_token(&self, token: &RefreshTokenRecord) -> AuthResult<()> {
        self.refresh_tokens()
            .insert_one(token)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn unset_refresh_token(&self, refresh_token: &str) -> AuthResult<()> {
        self.refresh_tokens()
            .delete_one(doc! { "refresh_token": refresh_token })
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn check_user_credentials(&self, username: &str, password: &str) -> AuthResult<bool> {
        let user = self
            .users()
            .find_one(doc! { "username": username })
            .await
            .map_err(StorageError::from)?;
        match user.and_then(|u| u.password) {
            Some(stored) => verify_stored_password(password, &stored),
            None => Ok(false),
        }
    }

    async fn get_user_details(&self, username: &str) -> AuthResult<Option<UserDetails>> {
        let user = self
            .users()
            .find_one(doc! { "username": username })
            .await
            .map_err(StorageError::from)?;
        Ok(user.map(UserDocument::into_details))
    }

    async fn scope_exists(&self, scope: &str) -> AuthResult<bool> {
        let parts = scope_parts(scope);
        if parts.is_empty() {
            return Ok(true);
        }
        let count = self
            .scopes()
            .count_documents(doc! { "scope": { "$in": parts.clone() } })
            .await
            .map_err(StorageError::from)?;
        Ok(usize::try_from(count).is_ok_and(|c| c == parts.len()))
    }

    async fn get_default_scope(&self, _client_id: Option<&str>) -> AuthResult<Option<String>> {
        let cursor = self
            .scopes()
            .find(doc! { "is_default": true })
            .sort(doc! { "scope": 1 })
            .await
            .map_err(StorageError::from)?;
        let scopes: Vec<ScopeDocument> = cursor.try_collect().await.map_err(StorageError::from)?;
        if scopes.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            scopes
                .into_iter()
                .map(|s| s.scope)
                .collect::<Vec<_>>()
                .join(" "),
        ))
    }
}
