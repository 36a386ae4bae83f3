//! Composition entry point.
//!
//! [`CryptoTokenServerFactory`] wraps the deployment's own server factory.
//! Every server it builds gets a [`JwtAccessTokenStorage`] registered for the
//! `access_token` capability and a [`JwtAccessTokenResponseType`] registered
//! for the `token` response type, both signing with the configured key pair.
//! With `inject_existing_storage` enabled, the route's pre-existing storage
//! becomes the delegate for every other capability.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cryptotoken_auth::AuthResult;
use cryptotoken_auth::config::{CryptoTokenConfig, StorageBlock};
use cryptotoken_auth::keys::KeyPair;
use cryptotoken_auth::server::{OAuthServer, ServerFactory};
use cryptotoken_auth::storage::{Capability, LegacyStorage};
use cryptotoken_auth::token::{JwtAccessTokenResponseType, JwtAccessTokenStorage};

use crate::resolver::resolve_storage;
use crate::services::ServiceLookup;

/// Server factory that wires JWT access tokens into every server it builds.
pub struct CryptoTokenServerFactory<F> {
    inner: F,
    config: Arc<CryptoTokenConfig>,
    services: Arc<dyn ServiceLookup>,
}

impl<F> CryptoTokenServerFactory<F> {
    /// Wraps `inner`.
    ///
    /// `services` is consulted only when `inject_existing_storage` is set.
    pub fn new(
        inner: F,
        config: Arc<CryptoTokenConfig>,
        services: Arc<dyn ServiceLookup>,
    ) -> Self {
        Self {
            inner,
            config,
            services,
        }
    }

    /// The configuration servers are built from.
    #[must_use]
    pub fn config(&self) -> &CryptoTokenConfig {
        &self.config
    }

    /// The wrapped factory.
    #[must_use]
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Storage block of the adapter entry configured for `route`.
    ///
    /// Entries are scanned in configuration order and a later match replaces
    /// an earlier one.
    fn storage_block_for(&self, route: &str) -> Option<&StorageBlock> {
        let mut matches = self
            .config
            .authentication
            .adapters
            .iter()
            .filter_map(|(name, entry)| entry.storage.as_ref().map(|block| (name, block)))
            .filter(|(_, block)| block.route.as_deref() == Some(route));

        let (mut name, mut block) = matches.next()?;
        for (later, later_block) in matches {
            tracing::warn!(
                route,
                ignored = %name,
                used = %later,
                "Several authentication adapters configure storage for the same route; using the last"
            );
            (name, block) = (later, later_block);
        }
        Some(block)
    }

    async fn legacy_storage(&self, route: &str) -> AuthResult<Option<LegacyStorage>> {
        if !self.config.inject_existing_storage {
            return Ok(None);
        }

        let Some(block) = self.storage_block_for(route) else {
            tracing::debug!(route, "No existing OAuth2 storage configured for route");
            return Ok(None);
        };

        let legacy = resolve_storage(block, self.services.as_ref()).await?;
        tracing::debug!(route, delegate = ?legacy, "Resolved existing OAuth2 storage");
        Ok(Some(legacy))
    }
}

impl<F: fmt::Debug> fmt::Debug for CryptoTokenServerFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoTokenServerFactory")
            .field("inner", &self.inner)
            .field(
                "inject_existing_storage",
                &self.config.inject_existing_storage,
            )
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> ServerFactory for CryptoTokenServerFactory<F>
where
    F: ServerFactory,
{
    type Server = F::Server;

    async fn create(&self, route: &str) -> AuthResult<Self::Server> {
        self.build(route).await.inspect_err(|err| {
            tracing::error!(
                route,
                category = %err.category(),
                fatal = err.is_fatal(),
                error = %err,
                "Failed to wire crypto tokens into OAuth2 server"
            );
        })
    }
}

impl<F> CryptoTokenServerFactory<F>
where
    F: ServerFactory,
{
    async fn build(&self, route: &str) -> AuthResult<F::Server> {
        let keys = Arc::new(KeyPair::load(&self.config.keys)?);
        let delegate = self.legacy_storage(route).await?;
        let injected = delegate.is_some();

        let mut server = self.inner.create(route).await?;

        let storage = JwtAccessTokenStorage::new(Arc::clone(&keys), delegate.clone())
            .with_issuer(self.config.token.issuer.clone());
        server.add_storage(Arc::new(storage), Capability::AccessToken);

        let response_type = JwtAccessTokenResponseType::new(keys, delegate, &self.config.token);
        server.add_response_type(Arc::new(response_type));

        tracing::info!(
            route,
            algorithm = %self.config.keys.algorithm,
            existing_storage = injected,
            "Crypto token storage wired into OAuth2 server"
        );
        Ok(server)
    }
}
