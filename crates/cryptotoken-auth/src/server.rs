//! Server-build collaborator.
//!
//! The OAuth2 server itself is built elsewhere; this crate only needs to
//! register storage and response types on it. [`ServerFactory`] builds a
//! server for a route and [`OAuthServer`] is the registration surface.
//! [`BasicOAuthServer`] is a minimal in-process implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::storage::{Capability, OAuthStorage};
use crate::token::ResponseType;

/// Registration surface of an OAuth2 server.
pub trait OAuthServer: Send + Sync {
    /// Registers `storage` for `capability`, replacing any earlier one.
    fn add_storage(&mut self, storage: Arc<dyn OAuthStorage>, capability: Capability);

    /// Registers a response type under its own name.
    fn add_response_type(&mut self, response_type: Arc<dyn ResponseType>);
}

/// Builds OAuth2 servers for routes.
#[async_trait]
pub trait ServerFactory: Send + Sync {
    /// The server type produced.
    type Server: OAuthServer;

    /// Builds the server for `route`.
    async fn create(&self, route: &str) -> AuthResult<Self::Server>;
}

/// Adapts a plain closure into a [`ServerFactory`].
pub struct ServerFn<F>(pub F);

impl<F> fmt::Debug for ServerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerFn")
    }
}

#[async_trait]
impl<F, S> ServerFactory for ServerFn<F>
where
    F: Fn(&str) -> AuthResult<S> + Send + Sync,
    S: OAuthServer,
{
    type Server = S;

    async fn create(&self, route: &str) -> AuthResult<S> {
        (self.0)(route)
    }
}

/// A server that only records what is registered on it.
#[derive(Default)]
pub struct BasicOAuthServer {
    route: String,
    storages: HashMap<Capability, Arc<dyn OAuthStorage>>,
    response_types: HashMap<&'static str, Arc<dyn ResponseType>>,
}

impl BasicOAuthServer {
    /// Creates an empty server for `route`.
    #[must_use]
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            ..Self::default()
        }
    }

    /// The route this server was built for.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Storage registered for `capability`.
    #[must_use]
    pub fn storage(&self, capability: Capability) -> Option<&Arc<dyn OAuthStorage>> {
        self.storages.get(&capability)
    }

    /// Response type registered under `name`.
    #[must_use]
    pub fn response_type(&self, name: &str) -> Option<&Arc<dyn ResponseType>> {
        self.response_types.get(name)
    }
}

impl fmt::Debug for BasicOAuthServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut storages: Vec<_> = self.storages.keys().map(Capability::as_str).collect();
        storages.sort_unstable();
        let mut response_types: Vec<_> = self.response_types.keys().collect();
        response_types.sort_unstable();

        f.debug_struct("BasicOAuthServer")
            .field("route", &self.route)
            .field("storages", &storages)
            .field("response_types", &response_types)
            .finish()
    }
}

impl OAuthServer for BasicOAuthServer {
    fn add_storage(&mut self, storage: Arc<dyn OAuthStorage>, capability: Capability) {
        self.storages.insert(capability, storage);
    }

    fn add_response_type(&mut self, response_type: Arc<dyn ResponseType>) {
        self.response_types
            .insert(response_type.response_type(), response_type);
    }
}
