//! Document shapes that are not shared with the public record types.

use cryptotoken_auth::storage::UserDetails;
use serde::{Deserialize, Serialize};

/// A user document, including the stored password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UserDocument {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub scope: Option<String>,
}

impl UserDocument {
    pub(crate) fn into_details(self) -> UserDetails {
        UserDetails {
            user_id: self.username.clone(),
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            email_verified: self.email_verified,
            scope: self.scope,
        }
    }
}

/// A scope definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ScopeDocument {
    pub scope: String,
    #[serde(default)]
    pub is_default: bool,
}
