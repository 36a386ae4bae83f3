//! Legacy storage resolution.
//!
//! Turns a per-route storage block into the [`LegacyStorage`] the JWT access
//! token storage forwards to. A block either names a built-in adapter
//! (`pdo` or `mongo`) or refers to registered storage services by name.
//! Nothing is cached; every call resolves afresh.

use std::sync::Arc;

use cryptotoken_auth::AuthResult;
use cryptotoken_auth::config::{AdapterConfig, MongoConfig, StorageBlock, StorageConfig, StorageRefs};
use cryptotoken_auth::error::AuthError;
use cryptotoken_auth::storage::{LegacyStorage, OAuthStorage};
use cryptotoken_auth_mongo::MongoStorage;
use cryptotoken_auth_postgres::PostgresStorage;
use indexmap::IndexMap;

use crate::services::{Service, ServiceLookup};

/// Resolves a raw per-route storage block.
///
/// # Errors
///
/// Returns the errors of [`StorageBlock::to_storage_config`] and [`resolve`].
pub async fn resolve_storage(
    block: &StorageBlock,
    lookup: &dyn ServiceLookup,
) -> AuthResult<LegacyStorage> {
    let config = block.to_storage_config()?;
    resolve(&config, lookup).await
}

/// Resolves a storage configuration.
///
/// # Errors
///
/// - [`AuthError::MissingDatabaseConfig`] for `mongo` without a registered
///   handle or database name
/// - [`AuthError::ServiceNotFound`] for a storage name the lookup cannot
///   provide as storage
/// - [`AuthError::Configuration`] for an unusable DSN or driver option
pub async fn resolve(
    config: &StorageConfig,
    lookup: &dyn ServiceLookup,
) -> AuthResult<LegacyStorage> {
    match config {
        StorageConfig::Adapter(AdapterConfig::Pdo(pdo)) => {
            tracing::debug!(adapter = "pdo", "Building relational OAuth2 storage");
            let storage = PostgresStorage::connect_lazy(pdo)?;
            Ok(LegacyStorage::Single(Arc::new(storage)))
        }
        StorageConfig::Adapter(AdapterConfig::Mongo(mongo)) => {
            let storage = mongo_storage(mongo, lookup).await?;
            Ok(LegacyStorage::Single(Arc::new(storage)))
        }
        StorageConfig::Services(refs) => services(refs, lookup),
    }
}

async fn mongo_storage(config: &MongoConfig, lookup: &dyn ServiceLookup) -> AuthResult<MongoStorage> {
    if lookup.has(&config.locator_name) {
        return match lookup.get(&config.locator_name)? {
            Service::MongoDatabase(db) => {
                tracing::debug!(
                    adapter = "mongo",
                    locator = %config.locator_name,
                    "Using registered MongoDB database"
                );
                Ok(MongoStorage::new(db, config.settings.clone()))
            }
            other => Err(AuthError::configuration(format!(
                "service '{}' is a {} service, not a MongoDB database",
                config.locator_name,
                other.kind()
            ))),
        };
    }

    if config.database.as_deref().is_none_or(str::is_empty) {
        return Err(AuthError::MissingDatabaseConfig);
    }

    tracing::debug!(adapter = "mongo", "Building document OAuth2 storage");
    Ok(MongoStorage::connect(config).await?)
}

fn services(refs: &StorageRefs, lookup: &dyn ServiceLookup) -> AuthResult<LegacyStorage> {
    if let StorageRefs::Single(name) = refs {
        return Ok(LegacyStorage::Single(storage_service(name, lookup)?));
    }

    let mut named = IndexMap::new();
    for (key, name) in refs.entries() {
        named.insert(key, storage_service(name, lookup)?);
    }
    tracing::debug!(count = named.len(), "Resolved OAuth2 storage services");
    Ok(LegacyStorage::Named(named))
}

fn storage_service(name: &str, lookup: &dyn ServiceLookup) -> AuthResult<Arc<dyn OAuthStorage>> {
    match lookup.get(name)? {
        Service::Storage(storage) => Ok(storage),
        other => {
            tracing::debug!(service = name, kind = other.kind(), "Service is not OAuth2 storage");
            Err(AuthError::service_not_found(name))
        }
    }
}
