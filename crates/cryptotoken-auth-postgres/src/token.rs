//! Token and authorization code storage.
//!
//! Opaque access tokens, refresh tokens and authorization codes. Expiry is
//! kept in `TIMESTAMPTZ` columns and exchanged as Unix seconds.

use cryptotoken_auth::config::StorageSettings;
use cryptotoken_auth::storage::{AccessTokenRecord, AuthorizationCode, RefreshTokenRecord};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use crate::{PgPool, StorageResult, to_timestamp};

type TokenTuple = (String, String, Option<String>, OffsetDateTime, Option<String>);

type CodeTuple = (
    String,
    String,
    Option<String>,
    Option<String>,
    OffsetDateTime,
    Option<String>,
    Option<String>,
);

/// Token storage operations.
pub struct TokenStorage<'a> {
    pool: &'a PgPool,
    settings: &'a StorageSettings,
}

impl<'a> TokenStorage<'a> {
    /// Create a new token storage.
    #[must_use]
    pub fn new(pool: &'a PgPool, settings: &'a StorageSettings) -> Self {
        Self { pool, settings }
    }

    // -------------------------------------------------------------------------
    // Access tokens
    // -------------------------------------------------------------------------

    /// Find an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_access_token(&self, token: &str) -> StorageResult<Option<AccessTokenRecord>> {
        let sql = format!(
            "SELECT access_token, client_id, user_id, expires, scope FROM {} WHERE access_token = $1",
            self.settings.access_token_table
        );
        let row: Option<TokenTuple> = query_as(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|r| AccessTokenRecord {
            access_token: r.0,
            client_id: r.1,
            user_id: r.2,
            expires: r.3.unix_timestamp(),
            scope: r.4,
            jti: None,
        }))
    }

    /// Create or replace an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the expiry is out of range or the write fails.
    pub async fn upsert_access_token(&self, token: &AccessTokenRecord) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO {} (access_token, client_id, user_id, expires, scope) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (access_token) DO UPDATE SET \
               client_id = EXCLUDED.client_id, \
               user_id = EXCLUDED.user_id, \
               expires = EXCLUDED.expires, \
               scope = EXCLUDED.scope",
            self.settings.access_token_table
        );
        query(&sql)
            .bind(&token.access_token)
            .bind(&token.client_id)
            .bind(&token.user_id)
            .bind(to_timestamp(token.expires)?)
            .bind(&token.scope)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete an access token. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete_access_token(&self, token: &str) -> StorageResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE access_token = $1",
            self.settings.access_token_table
        );
        let result = query(&sql).bind(token).execute(self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Refresh tokens
    // -------------------------------------------------------------------------

    /// Find a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_refresh_token(
        &self,
        token: &str,
    ) -> StorageResult<Option<RefreshTokenRecord>> {
        let sql = format!(
            "SELECT refresh_token, client_id, user_id, expires, scope FROM {} WHERE refresh_token = $1",
            self.settings.refresh_token_table
        );
        let row: Option<TokenTuple> = query_as(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|r| RefreshTokenRecord {
            refresh_token: r.0,
            client_id: r.1,
            user_id: r.2,
            expires: r.3.unix_timestamp(),
            scope: r.4,
        }))
    }

    /// Store a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the expiry is out of range or the insert fails.
    pub async fn insert_refresh_token(&self, token: &RefreshTokenRecord) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO {} (refresh_token, client_id, user_id, expires, scope) \
             VALUES ($1, $2, $3, $4, $5)",
            self.settings.refresh_token_table
        );
        query(&sql)
            .bind(&token.refresh_token)
            .bind(&token.client_id)
            .bind(&token.user_id)
            .bind(to_timestamp(token.expires)?)
            .bind(&token.scope)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete_refresh_token(&self, token: &str) -> StorageResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE refresh_token = $1",
            self.settings.refresh_token_table
        );
        query(&sql).bind(token).execute(self.pool).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Authorization codes
    // -------------------------------------------------------------------------

    /// Find an authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_code(&self, code: &str) -> StorageResult<Option<AuthorizationCode>> {
        let sql = format!(
            "SELECT authorization_code, client_id, user_id, redirect_uri, expires, scope, id_token \
             FROM {} WHERE authorization_code = $1",
            self.settings.code_table
        );
        let row: Option<CodeTuple> = query_as(&sql)
            .bind(code)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|r| AuthorizationCode {
            code: r.0,
            client_id: r.1,
            user_id: r.2,
            redirect_uri: r.3,
            expires: r.4.unix_timestamp(),
            scope: r.5,
            id_token: r.6,
        }))
    }

    /// Create or replace an authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the expiry is out of range or the write fails.
    pub async fn upsert_code(&self, code: &AuthorizationCode) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO {} (authorization_code, client_id, user_id, redirect_uri, expires, scope, id_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (authorization_code) DO UPDATE SET \
               client_id = EXCLUDED.client_id, \
               user_id = EXCLUDED.user_id, \
               redirect_uri = EXCLUDED.redirect_uri, \
               expires = EXCLUDED.expires, \
               scope = EXCLUDED.scope, \
               id_token = EXCLUDED.id_token",
            self.settings.code_table
        );
        query(&sql)
            .bind(&code.code)
            .bind(&code.client_id)
            .bind(&code.user_id)
            .bind(&code.redirect_uri)
            .bind(to_timestamp(code.expires)?)
            .bind(&code.scope)
            .bind(&code.id_token)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete an authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete_code(&self, code: &str) -> StorageResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE authorization_code = $1",
            self.settings.code_table
        );
        query(&sql).bind(code).execute(self.pool).await?;
        Ok(())
    }
}
