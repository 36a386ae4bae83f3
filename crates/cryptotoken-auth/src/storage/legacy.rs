//! Legacy storage delegate.
//!
//! The deployment's pre-existing storage is either one object handling every
//! concern it supports, or a keyed mapping of objects. Routing a capability
//! through a mapping prefers the entry keyed by the capability name, then
//! falls back to the first entry (in configuration order) that supports it.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{Capability, OAuthStorage};

/// Pre-existing storage the JWT access token storage forwards to.
#[derive(Clone)]
pub enum LegacyStorage {
    /// One storage object.
    Single(Arc<dyn OAuthStorage>),
    /// Storage objects keyed by capability name or list position.
    Named(IndexMap<String, Arc<dyn OAuthStorage>>),
}

impl LegacyStorage {
    /// Returns the storage object that handles `capability`, if any.
    #[must_use]
    pub fn route(&self, capability: Capability) -> Option<&Arc<dyn OAuthStorage>> {
        match self {
            Self::Single(storage) => storage.supports(capability).then_some(storage),
            Self::Named(map) => map
                .get(capability.as_str())
                .or_else(|| map.values().find(|storage| storage.supports(capability))),
        }
    }

    /// Returns `true` if some storage object handles `capability`.
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.route(capability).is_some()
    }

    /// Returns the storage object registered under `key` in a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<dyn OAuthStorage>> {
        match self {
            Self::Single(_) => None,
            Self::Named(map) => map.get(key),
        }
    }

    /// Number of storage objects.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Named(map) => map.len(),
        }
    }

    /// Returns `true` for an empty mapping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for LegacyStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(_) => f.write_str("LegacyStorage::Single"),
            Self::Named(map) => f
                .debug_tuple("LegacyStorage::Named")
                .field(&map.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}
