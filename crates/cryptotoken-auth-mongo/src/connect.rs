//! Lazily connecting clients from document adapter settings.
//!
//! Connection strings are parsed with the driver; a handful of driver options
//! may also be given in the adapter's `options` table. A `connect` option is
//! accepted for compatibility and ignored, since clients never connect
//! eagerly.

use std::time::Duration;

use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use serde_json::{Map, Value};

use crate::{StorageError, StorageResult};

/// Connection string used when none is configured.
pub const DEFAULT_DSN: &str = "mongodb://localhost:27017";

/// Opens a lazily connecting handle to `database`.
///
/// # Errors
///
/// Returns [`StorageError::Driver`] if the connection string cannot be parsed
/// and [`StorageError::InvalidOption`] for a mistyped option.
pub async fn database(
    dsn: Option<&str>,
    options: &Map<String, Value>,
    database: &str,
) -> StorageResult<Database> {
    let dsn = dsn.filter(|d| !d.is_empty()).unwrap_or(DEFAULT_DSN);
    let mut client_options = ClientOptions::parse(dsn).await?;
    apply_options(&mut client_options, options)?;

    tracing::debug!(
        hosts = client_options.hosts.len(),
        database,
        "Creating lazy MongoDB client for OAuth2 storage"
    );

    let client = Client::with_options(client_options)?;
    Ok(client.database(database))
}

/// Applies adapter options on top of the parsed connection string.
///
/// # Errors
///
/// Returns [`StorageError::InvalidOption`] for a known option of the wrong type.
pub fn apply_options(
    client_options: &mut ClientOptions,
    options: &Map<String, Value>,
) -> StorageResult<()> {
    for (key, value) in options {
        match key.as_str() {
            "connect" => {
                tracing::debug!("Ignoring 'connect' option; MongoDB clients connect lazily");
            }
            "appname" | "appName" => client_options.app_name = Some(as_string(key, value)?),
            "replicaSet" => client_options.repl_set_name = Some(as_string(key, value)?),
            "connectTimeoutMS" => {
                client_options.connect_timeout = Some(Duration::from_millis(as_u64(key, value)?));
            }
            "serverSelectionTimeoutMS" => {
                client_options.server_selection_timeout =
                    Some(Duration::from_millis(as_u64(key, value)?));
            }
            "maxPoolSize" => client_options.max_pool_size = Some(as_u32(key, value)?),
            "minPoolSize" => client_options.min_pool_size = Some(as_u32(key, value)?),
            other => tracing::warn!(option = other, "Ignoring unsupported MongoDB option"),
        }
    }
    Ok(())
}

fn as_string(key: &str, value: &Value) -> StorageResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| StorageError::invalid_option(key, "expected a string"))
}

fn as_u64(key: &str, value: &Value) -> StorageResult<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| StorageError::invalid_option(key, "expected a number"))
}

fn as_u32(key: &str, value: &Value) -> StorageResult<u32> {
    u32::try_from(as_u64(key, value)?)
        .map_err(|_| StorageError::invalid_option(key, "number out of range"))
}
