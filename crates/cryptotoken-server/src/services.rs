//! Named services available to storage resolution.
//!
//! Per-route storage blocks refer to pre-existing storage by service name,
//! and the document adapter may reuse a registered database handle.
//! [`ServiceLookup`] is the seam; [`ServiceRegistry`] is the in-process
//! implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cryptotoken_auth::AuthResult;
use cryptotoken_auth::error::AuthError;
use cryptotoken_auth::storage::OAuthStorage;
use mongodb::Database;

/// A registered service.
#[derive(Clone)]
pub enum Service {
    /// A storage object.
    Storage(Arc<dyn OAuthStorage>),
    /// A MongoDB database handle.
    MongoDatabase(Database),
}

impl Service {
    /// Short name of the service kind, for logs and errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage(_) => "storage",
            Self::MongoDatabase(_) => "mongo_database",
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(_) => f.write_str("Service::Storage"),
            Self::MongoDatabase(db) => f
                .debug_tuple("Service::MongoDatabase")
                .field(&db.name())
                .finish(),
        }
    }
}

/// Resolves services by name.
pub trait ServiceLookup: Send + Sync {
    /// Returns `true` if a service is registered under `name`.
    fn has(&self, name: &str) -> bool;

    /// Returns the service registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ServiceNotFound`] if nothing is registered.
    fn get(&self, name: &str) -> AuthResult<Service>;
}

/// In-process service registry.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Service>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service, replacing any earlier one with the same name.
    pub fn register(&mut self, name: impl Into<String>, service: Service) -> &mut Self {
        self.services.insert(name.into(), service);
        self
    }

    /// Registers a storage object.
    pub fn register_storage(
        &mut self,
        name: impl Into<String>,
        storage: Arc<dyn OAuthStorage>,
    ) -> &mut Self {
        self.register(name, Service::Storage(storage))
    }

    /// Registers a MongoDB database handle.
    pub fn register_mongo(&mut self, name: impl Into<String>, database: Database) -> &mut Self {
        self.register(name, Service::MongoDatabase(database))
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceLookup for ServiceRegistry {
    fn has(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    fn get(&self, name: &str) -> AuthResult<Service> {
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::service_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptotoken_auth::storage::MemoryStorage;

    #[test]
    fn test_registry_lookup() {
        let storage: Arc<dyn OAuthStorage> = Arc::new(MemoryStorage::new());
        let mut registry = ServiceRegistry::new();
        registry.register_storage("oauth.storage", Arc::clone(&storage));

        assert!(registry.has("oauth.storage"));
        assert!(!registry.has("other"));
        assert_eq!(registry.len(), 1);

        match registry.get("oauth.storage").unwrap() {
            Service::Storage(found) => assert!(Arc::ptr_eq(&found, &storage)),
            other => panic!("unexpected service: {other:?}"),
        }
    }

    #[test]
    fn test_missing_service() {
        let registry = ServiceRegistry::new();
        assert!(registry.is_empty());

        let err = registry.get("ghost").unwrap_err();
        assert!(matches!(err, AuthError::ServiceNotFound { ref name } if name == "ghost"));
    }
}
