//! Error types for JWT access token wiring.
//!
//! Errors split into three groups:
//!
//! - deployment errors raised while a server is being built (missing key
//!   files, unusable storage configuration); these are fatal and never retried
//! - lazy capability errors raised when a grant flow needs a storage concern
//!   that no delegate provides
//! - runtime failures from storage drivers or signing
//!
//! An invalid or expired access token is *not* an error: token retrieval
//! reports it as "not found".

use std::fmt;

use crate::keys::KeyKind;
use crate::storage::Capability;

/// Errors that can occur while building or using the JWT-backed server wiring.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A key path is unset, or the file is missing or unreadable.
    #[error("You must provide a {key} key file to use crypto tokens (path: {path})")]
    MissingKeyFile {
        /// Which half of the key pair is missing.
        key: KeyKind,
        /// The configured path, or `<unset>`.
        path: String,
    },

    /// A storage block carries neither `adapter` nor `storage`.
    #[error("Missing or invalid storage adapter information for OAuth2")]
    MissingStorageConfig,

    /// The relational adapter was selected without a DSN.
    #[error("Missing DSN for OAuth2 relational adapter creation")]
    MissingDsn,

    /// The document adapter has no registered database and no database name.
    #[error("Missing OAuth2 Mongo database configuration")]
    MissingDatabaseConfig,

    /// The `adapter` value names no built-in adapter.
    #[error("Invalid storage adapter type for OAuth2: {adapter}")]
    InvalidAdapterType {
        /// The configured adapter value.
        adapter: String,
    },

    /// A storage service name could not be resolved by the service lookup.
    #[error("Service not found: {name}")]
    ServiceNotFound {
        /// The requested service name.
        name: String,
    },

    /// A storage capability was invoked but no delegate provides it.
    #[error("Unsupported operation: no storage configured for the '{capability}' capability")]
    UnsupportedOperation {
        /// The capability that was requested.
        capability: Capability,
    },

    /// Signing a token failed.
    #[error("Signing error: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// An error occurred while storing or retrieving OAuth2 data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `MissingKeyFile` error.
    #[must_use]
    pub fn missing_key_file(key: KeyKind, path: Option<&std::path::Path>) -> Self {
        Self::MissingKeyFile {
            key,
            path: path.map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
        }
    }

    /// Creates a new `InvalidAdapterType` error.
    #[must_use]
    pub fn invalid_adapter_type(adapter: impl Into<String>) -> Self {
        Self::InvalidAdapterType {
            adapter: adapter.into(),
        }
    }

    /// Creates a new `ServiceNotFound` error.
    #[must_use]
    pub fn service_not_found(name: impl Into<String>) -> Self {
        Self::ServiceNotFound { name: name.into() }
    }

    /// Creates a new `UnsupportedOperation` error.
    #[must_use]
    pub fn unsupported(capability: Capability) -> Self {
        Self::UnsupportedOperation { capability }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the error means the deployment is misconfigured.
    ///
    /// These abort a server build and must not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingKeyFile { .. }
                | Self::MissingStorageConfig
                | Self::MissingDsn
                | Self::MissingDatabaseConfig
                | Self::InvalidAdapterType { .. }
                | Self::ServiceNotFound { .. }
                | Self::Configuration { .. }
        )
    }

    /// Returns `true` if this is a storage resolution error.
    #[must_use]
    pub fn is_storage_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingStorageConfig
                | Self::MissingDsn
                | Self::MissingDatabaseConfig
                | Self::InvalidAdapterType { .. }
                | Self::ServiceNotFound { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingKeyFile { .. } => ErrorCategory::KeyMaterial,
            Self::MissingStorageConfig
            | Self::MissingDsn
            | Self::MissingDatabaseConfig
            | Self::InvalidAdapterType { .. }
            | Self::ServiceNotFound { .. } => ErrorCategory::StorageResolution,
            Self::UnsupportedOperation { .. } => ErrorCategory::Capability,
            Self::Signing { .. } => ErrorCategory::Token,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code reported to clients for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedOperation { .. } => "unsupported_grant_type",
            _ => "server_error",
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Key files missing or unreadable.
    KeyMaterial,
    /// Legacy storage could not be resolved from configuration.
    StorageResolution,
    /// A storage capability has no backing delegate.
    Capability,
    /// Token signing failures.
    Token,
    /// Infrastructure/storage driver errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyMaterial => write!(f, "key_material"),
            Self::StorageResolution => write!(f, "storage_resolution"),
            Self::Capability => write!(f, "capability"),
            Self::Token => write!(f, "token"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
