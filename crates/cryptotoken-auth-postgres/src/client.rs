//! Client storage.
//!
//! Client registrations with optional secret, redirect URI, allowed grant
//! types and scope. Secrets are compared as stored.

use cryptotoken_auth::storage::ClientDetails;
use sqlx_core::query_as::query_as;

use crate::{PgPool, StorageResult};

type ClientTuple = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn from_tuple(row: ClientTuple) -> ClientDetails {
    ClientDetails {
        client_id: row.0,
        client_secret: row.1,
        redirect_uri: row.2,
        grant_types: row.3,
        scope: row.4,
        user_id: row.5,
    }
}

/// Client storage operations.
pub struct ClientStorage<'a> {
    pool: &'a PgPool,
    table: &'a str,
}

impl<'a> ClientStorage<'a> {
    /// Create a new client storage over `table`.
    #[must_use]
    pub fn new(pool: &'a PgPool, table: &'a str) -> Self {
        Self { pool, table }
    }

    /// Find a client by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, client_id: &str) -> StorageResult<Option<ClientDetails>> {
        let sql = format!(
            "SELECT client_id, client_secret, redirect_uri, grant_types, scope, user_id \
             FROM {} WHERE client_id = $1",
            self.table
        );
        let row: Option<ClientTuple> = query_as(&sql)
            .bind(client_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(from_tuple))
    }

    /// Create or replace a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn upsert(&self, client: &ClientDetails) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO {} (client_id, client_secret, redirect_uri, grant_types, scope, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (client_id) DO UPDATE SET \
               client_secret = EXCLUDED.client_secret, \
               redirect_uri = EXCLUDED.redirect_uri, \
               grant_types = EXCLUDED.grant_types, \
               scope = EXCLUDED.scope, \
               user_id = EXCLUDED.user_id",
            self.table
        );
        sqlx_core::query::query(&sql)
            .bind(&client.client_id)
            .bind(&client.client_secret)
            .bind(&client.redirect_uri)
            .bind(&client.grant_types)
            .bind(&client.scope)
            .bind(&client.user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
