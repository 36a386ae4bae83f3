//! Records exchanged through the storage surface.
//!
//! Expiry times are Unix timestamps in seconds. Field names follow the column
//! names of the conventional OAuth2 schema so documents and rows map directly.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An access token as seen by the OAuth2 server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenRecord {
    /// The token string presented by clients.
    pub access_token: String,
    /// Client the token was issued to.
    pub client_id: String,
    /// Resource owner, absent for client credentials grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Expiry (Unix seconds).
    pub expires: i64,
    /// Space-separated granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Unique token id, present for self-contained tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// A registered OAuth2 client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDetails {
    /// Client identifier.
    pub client_id: String,
    /// Client secret; absent or empty for public clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Registered redirect URI(s), space-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// Allowed grant types, space-separated. Absent means unrestricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types: Option<String>,
    /// Scope the client may request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Owning user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ClientDetails {
    /// Creates a client with only an identifier.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            grant_types: None,
            scope: None,
            user_id: None,
        }
    }

    /// Returns `true` if the client has no secret.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.client_secret.as_deref().is_none_or(str::is_empty)
    }

    /// Compares a presented secret against the stored one.
    ///
    /// Public clients match when no secret is presented.
    #[must_use]
    pub fn verify_secret(&self, presented: Option<&str>) -> bool {
        match (self.client_secret.as_deref().filter(|s| !s.is_empty()), presented) {
            (Some(stored), Some(presented)) => stored == presented,
            (None, None) => true,
            (None, Some(presented)) => presented.is_empty(),
            (Some(_), None) => false,
        }
    }

    /// Returns `true` if the client may use the grant type.
    #[must_use]
    pub fn allows_grant_type(&self, grant_type: &str) -> bool {
        match self.grant_types.as_deref() {
            Some(grants) if !grants.trim().is_empty() => {
                grants.split_whitespace().any(|g| g == grant_type)
            }
            _ => true,
        }
    }
}

/// An issued authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The code value.
    #[serde(rename = "authorization_code")]
    pub code: String,
    /// Client the code was issued to.
    pub client_id: String,
    /// Resource owner who approved the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Redirect URI of the authorization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// Expiry (Unix seconds).
    pub expires: i64,
    /// Approved scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// OpenID Connect ID token bound to the code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl AuthorizationCode {
    /// Returns `true` once the code can no longer be exchanged.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        is_expired(self.expires)
    }
}

/// An issued refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// The token value.
    pub refresh_token: String,
    /// Client the token was issued to.
    pub client_id: String,
    /// Resource owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Expiry (Unix seconds).
    pub expires: i64,
    /// Granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A resource owner, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    /// Login name.
    pub username: String,
    /// Stable user identifier, the username unless the backend stores another.
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    /// Scope the user may grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Returns `true` if the Unix timestamp lies in the past.
#[must_use]
pub fn is_expired(expires: i64) -> bool {
    expires < OffsetDateTime::now_utc().unix_timestamp()
}

/// Splits a space-separated scope string into its unique parts.
#[must_use]
pub fn scope_parts(scope: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = Vec::new();
    for part in scope.split_whitespace() {
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_code_expiry() {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut code = AuthorizationCode {
            code: "c1".to_string(),
            client_id: "web".to_string(),
            user_id: None,
            redirect_uri: None,
            expires: now + 30,
            scope: None,
            id_token: None,
        };
        assert!(!code.is_expired());
        code.expires = now - 1;
        assert!(code.is_expired());
    }

    #[test]
    fn test_public_client() {
        let client = ClientDetails::new("spa");
        assert!(client.is_public());
        assert!(client.verify_secret(None));
        assert!(!client.verify_secret(Some("guess")));

        let client = ClientDetails {
            client_secret: Some(String::new()),
            ..ClientDetails::new("spa")
        };
        assert!(client.is_public());
    }

    #[test]
    fn test_confidential_client() {
        let client = ClientDetails {
            client_secret: Some("s3cret".to_string()),
            ..ClientDetails::new("backend")
        };
        assert!(!client.is_public());
        assert!(client.verify_secret(Some("s3cret")));
        assert!(!client.verify_secret(Some("wrong")));
        assert!(!client.verify_secret(None));
    }

    #[test]
    fn test_grant_type_restrictions() {
        let unrestricted = ClientDetails::new("any");
        assert!(unrestricted.allows_grant_type("password"));

        let restricted = ClientDetails {
            grant_types: Some("authorization_code refresh_token".to_string()),
            ..ClientDetails::new("web")
        };
        assert!(restricted.allows_grant_type("refresh_token"));
        assert!(!restricted.allows_grant_type("client_credentials"));
    }

    #[test]
    fn test_authorization_code_field_names() {
        let code = AuthorizationCode {
            code: "xyz".to_string(),
            client_id: "web".to_string(),
            user_id: None,
            redirect_uri: None,
            expires: 1_700_000_000,
            scope: None,
            id_token: None,
        };
        let json = serde_json::to_value(&code).unwrap();
        assert_eq!(json["authorization_code"], "xyz");
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn test_scope_parts_dedupes() {
        assert_eq!(scope_parts("read  write read"), vec!["read", "write"]);
        assert!(scope_parts("   ").is_empty());
    }

    #[test]
    fn test_is_expired() {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        assert!(is_expired(now - 10));
        assert!(!is_expired(now + 10));
    }
}
