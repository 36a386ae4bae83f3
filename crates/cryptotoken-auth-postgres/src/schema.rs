//! DDL for the OAuth2 tables.

use cryptotoken_auth::config::StorageSettings;

/// Renders `CREATE TABLE IF NOT EXISTS` statements for every table.
#[must_use]
pub fn create_tables_sql(settings: &StorageSettings) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {clients} (
    client_id     VARCHAR(80) PRIMARY KEY,
    client_secret VARCHAR(80),
    redirect_uri  VARCHAR(2000),
    grant_types   VARCHAR(80),
    scope         VARCHAR(4000),
    user_id       VARCHAR(80)
);

CREATE TABLE IF NOT EXISTS {access_tokens} (
    access_token VARCHAR(40) PRIMARY KEY,
    client_id    VARCHAR(80) NOT NULL,
    user_id      VARCHAR(80),
    expires      TIMESTAMPTZ NOT NULL,
    scope        VARCHAR(4000)
);

CREATE TABLE IF NOT EXISTS {codes} (
    authorization_code VARCHAR(40) PRIMARY KEY,
    client_id          VARCHAR(80) NOT NULL,
    user_id            VARCHAR(80),
    redirect_uri       VARCHAR(2000),
    expires            TIMESTAMPTZ NOT NULL,
    scope              VARCHAR(4000),
    id_token           VARCHAR(1000)
);

CREATE TABLE IF NOT EXISTS {refresh_tokens} (
    refresh_token VARCHAR(40) PRIMARY KEY,
    client_id     VARCHAR(80) NOT NULL,
    user_id       VARCHAR(80),
    expires       TIMESTAMPTZ NOT NULL,
    scope         VARCHAR(4000)
);

CREATE TABLE IF NOT EXISTS {users} (
    username       VARCHAR(80) PRIMARY KEY,
    password       VARCHAR(255),
    first_name     VARCHAR(80),
    last_name      VARCHAR(80),
    email          VARCHAR(80),
    email_verified BOOLEAN,
    scope          VARCHAR(4000)
);

CREATE TABLE IF NOT EXISTS {scopes} (
    scope      VARCHAR(80) PRIMARY KEY,
    is_default BOOLEAN
);
"#,
        clients = settings.client_table,
        access_tokens = settings.access_token_table,
        codes = settings.code_table,
        refresh_tokens = settings.refresh_token_table,
        users = settings.user_table,
        scopes = settings.scope_table,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_configured_table_names() {
        let settings = StorageSettings {
            client_table: "tenant_clients".to_string(),
            ..StorageSettings::default()
        };
        let sql = create_tables_sql(&settings);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS tenant_clients"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS oauth_refresh_tokens"));
        assert_eq!(sql.matches("CREATE TABLE").count(), 6);
    }
}
