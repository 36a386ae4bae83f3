//! User and scope storage.
//!
//! Passwords may be stored as Argon2 PHC hashes or, for legacy rows, as plain
//! text. The username doubles as the user identifier.

use cryptotoken_auth::config::StorageSettings;
use cryptotoken_auth::storage::UserDetails;
use cryptotoken_auth::storage::types::scope_parts;
use sqlx_core::query_as::query_as;

use crate::{PgPool, StorageResult};

type UserTuple = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<bool>,
    Option<String>,
);

/// User and scope storage operations.
pub struct UserStorage<'a> {
    pool: &'a PgPool,
    settings: &'a StorageSettings,
}

impl<'a> UserStorage<'a> {
    /// Create a new user storage.
    #[must_use]
    pub fn new(pool: &'a PgPool, settings: &'a StorageSettings) -> Self {
        Self { pool, settings }
    }

    /// Find a user without credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, username: &str) -> StorageResult<Option<UserDetails>> {
        let sql = format!(
            "SELECT username, first_name, last_name, email, email_verified, scope \
             FROM {} WHERE username = $1",
            self.settings.user_table
        );
        let row: Option<UserTuple> = query_as(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|r| UserDetails {
            user_id: r.0.clone(),
            username: r.0,
            first_name: r.1,
            last_name: r.2,
            email: r.3,
            email_verified: r.4.unwrap_or(false),
            scope: r.5,
        }))
    }

    /// Fetch the stored password of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_password(&self, username: &str) -> StorageResult<Option<String>> {
        let sql = format!(
            "SELECT password FROM {} WHERE username = $1",
            self.settings.user_table
        );
        let row: Option<(Option<String>,)> = query_as(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.and_then(|r| r.0))
    }

    /// Returns `true` if every scope in the space-separated list is defined.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn scopes_exist(&self, scope: &str) -> StorageResult<bool> {
        let parts: Vec<String> = scope_parts(scope).into_iter().map(str::to_string).collect();
        if parts.is_empty() {
            return Ok(true);
        }

        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE scope = ANY($1)",
            self.settings.scope_table
        );
        let (count,): (i64,) = query_as(&sql)
            .bind(&parts)
            .fetch_one(self.pool)
            .await?;

        Ok(usize::try_from(count).is_ok_and(|c| c == parts.len()))
    }

    /// Space-separated default scopes, or `None` if none are flagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn default_scope(&self) -> StorageResult<Option<String>> {
        let sql = format!(
            "SELECT scope FROM {} WHERE is_default = TRUE ORDER BY scope",
            self.settings.scope_table
        );
        let rows: Vec<(String,)> = query_as(&sql).fetch_all(self.pool).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            rows.into_iter()
                .map(|(scope,)| scope)
                .collect::<Vec<_>>()
                .join(" "),
        ))
    }
}
