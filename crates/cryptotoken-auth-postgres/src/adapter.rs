//! `OAuthStorage` implementation for [`PostgresStorage`].

use async_trait::async_trait;
use cryptotoken_auth::AuthResult;
use cryptotoken_auth::secret::verify_stored_password;
use cryptotoken_auth::storage::types::is_expired;
use cryptotoken_auth::storage::{
    AccessTokenRecord, AuthorizationCode, Capability, ClientDetails, OAuthStorage,
    RefreshTokenRecord, UserDetails,
};

use crate::PostgresStorage;

#[async_trait]
impl OAuthStorage for PostgresStorage {
    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    async fn get_access_token(&self, access_token: &str) -> AuthResult<Option<AccessTokenRecord>> {
        Ok(self.tokens().find_access_token(access_token).await?)
    }

    async fn set_access_token(&self, token: &AccessTokenRecord) -> AuthResult<()> {
        Ok(self.tokens().upsert_access_token(token).await?)
    }

    async fn unset_access_token(&self, access_token: &str) -> AuthResult<bool> {
        Ok(self.tokens().delete_access_token(access_token).await?)
    }

    async fn get_authorization_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let code = self.tokens().find_code(code).await?;
        Ok(code.filter(|c| !c.is_expired()))
    }

    async fn set_authorization_code(&self, code: &AuthorizationCode) -> AuthResult<()> {
        Ok(self.tokens().upsert_code(code).await?)
    }

    async fn expire_authorization_code(&self, code: &str) -> AuthResult<()> {
        Ok(self.tokens().delete_code(code).await?)
    }

    async fn check_client_credentials(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<bool> {
        let client = self.clients().find(client_id).await?;
        Ok(client.is_some_and(|c| c.verify_secret(client_secret)))
    }

    async fn is_public_client(&self, client_id: &str) -> AuthResult<bool> {
        let client = self.clients().find(client_id).await?;
        Ok(client.is_some_and(|c| c.is_public()))
    }

    async fn get_client_details(&self, client_id: &str) -> AuthResult<Option<ClientDetails>> {
        Ok(self.clients().find(client_id).await?)
    }

    async fn get_client_scope(&self, client_id: &str) -> AuthResult<Option<String>> {
        let client = self.clients().find(client_id).await?;
        Ok(client.and_then(|c| c.scope))
    }

    async fn check_restricted_grant_type(
        &self,
        client_id: &str,
        grant_type: &str,
    ) -> AuthResult<bool> {
        let client = self.clients().find(client_id).await?;
        Ok(client.is_none_or(|c| c.allows_grant_type(grant_type)))
    }

    async fn get_refresh_token(&self, refresh_token: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let token = self.tokens().find_refresh_token(refresh_token).await?;
        Ok(token.filter(|t| !is_expired(t.expires)))
    }

    async fn set_refresh_token(&self, token: &RefreshTokenRecord) -> AuthResult<()> {
        Ok(self.tokens().insert_refresh_token(token).await?)
    }

    async fn unset_refresh_token(&self, refresh_token: &str) -> AuthResult<()> {
        Ok(self.tokens().delete_refresh_token(refresh_token).await?)
    }

    async fn check_user_credentials(&self, username: &str, password: &str) -> AuthResult<bool> {
        match self.users().find_password(username).await? {
            Some(stored) => verify_stored_password(password, &stored),
            None => Ok(false),
        }
    }

    async fn get_user_details(&self, username: &str) -> AuthResult<Option<UserDetails>> {
        Ok(self.users().find(username).await?)
    }

    async fn scope_exists(&self, scope: &str) -> AuthResult<bool> {
        Ok(self.users().scopes_exist(scope).await?)
    }

    async fn get_default_scope(&self, _client_id: Option<&str>) -> AuthResult<Option<String>> {
        Ok(self.users().default_scope().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptotoken_auth::config::{PdoConfig, StorageSettings};

    #[tokio::test]
    async fn test_lazy_storage_supports_every_capability() {
        let config = PdoConfig {
            dsn: "postgres://localhost/oauth".to_string(),
            username: None,
            password: None,
            options: serde_json::Map::new(),
            settings: StorageSettings::default(),
        };
        let storage = PostgresStorage::connect_lazy(&config).unwrap();

        for capability in Capability::ALL {
            assert!(storage.supports(capability));
        }
        assert_eq!(storage.settings().user_table, "oauth_users");
    }
}
