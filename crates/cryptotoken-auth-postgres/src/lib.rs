//! PostgreSQL storage backend for cryptotoken-auth.
//!
//! Implements the conventional OAuth2 storage surface over six tables whose
//! names come from [`StorageSettings`]:
//!
//! - clients
//! - access tokens (opaque tokens issued by other response types)
//! - authorization codes
//! - refresh tokens
//! - users
//! - scopes
//!
//! [`schema::create_tables_sql`] renders the matching DDL.
//!
//! # Example
//!
//! ```ignore
//! use cryptotoken_auth_postgres::PostgresStorage;
//!
//! // Lazily connecting storage; nothing touches the network yet
//! let storage = PostgresStorage::connect_lazy(&pdo_config)?;
//!
//! let client = storage.clients().find("my-app").await?;
//! ```

pub mod adapter;
pub mod client;
pub mod connect;
pub mod schema;
pub mod token;
pub mod user;

use std::sync::Arc;

use cryptotoken_auth::config::{PdoConfig, StorageSettings};
use cryptotoken_auth::error::AuthError;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use client::ClientStorage;
pub use token::TokenStorage;
pub use user::UserStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Connection string could not be understood.
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// Create an `InvalidDsn` error.
    #[must_use]
    pub fn invalid_dsn(message: impl Into<String>) -> Self {
        Self::InvalidDsn(message.into())
    }

    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if the storage could not be configured.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidDsn(_))
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        if err.is_configuration_error() {
            AuthError::configuration(err.to_string())
        } else {
            AuthError::storage(err.to_string())
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Storage
// =============================================================================

/// PostgreSQL storage backend.
///
/// Owns an `Arc<PgPool>` so it can be shared as `Arc<dyn OAuthStorage>`.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: Arc<PgPool>,
    settings: StorageSettings,
}

impl PostgresStorage {
    /// Create storage over an existing pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>, settings: StorageSettings) -> Self {
        Self { pool, settings }
    }

    /// Create storage with a pool that connects on first use.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidDsn`] if the connection string cannot be
    /// parsed.
    pub fn connect_lazy(config: &PdoConfig) -> StorageResult<Self> {
        let pool = connect::lazy_pool(config)?;
        Ok(Self::new(Arc::new(pool), config.settings.clone()))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Table names in use.
    #[must_use]
    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // Storage Accessors
    // -------------------------------------------------------------------------

    /// Get client storage operations.
    #[must_use]
    pub fn clients(&self) -> ClientStorage<'_> {
        ClientStorage::new(&self.pool, &self.settings.client_table)
    }

    /// Get token and authorization code storage operations.
    #[must_use]
    pub fn tokens(&self) -> TokenStorage<'_> {
        TokenStorage::new(&self.pool, &self.settings)
    }

    /// Get user and scope storage operations.
    #[must_use]
    pub fn users(&self) -> UserStorage<'_> {
        UserStorage::new(&self.pool, &self.settings)
    }
}

/// Converts a Unix timestamp to the `TIMESTAMPTZ` column value.
pub(crate) fn to_timestamp(expires: i64) -> StorageResult<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp(expires)
        .map_err(|e| StorageError::invalid_input(format!("expires out of range: {e}")))
}

// =============================================================================
// Tests
// =============================================================================
