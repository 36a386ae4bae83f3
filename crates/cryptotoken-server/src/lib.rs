//! # cryptotoken-server
//!
//! Builds OAuth2 servers whose access tokens are JWTs.
//!
//! [`CryptoTokenServerFactory`] wraps the deployment's server factory and
//! registers the JWT access token storage and response type on every server
//! it builds. The route's pre-existing storage, described by a per-route
//! storage block, is resolved into the legacy delegate by [`resolver`].
//!
//! ## Modules
//!
//! - [`factory`] - the composition entry point
//! - [`resolver`] - legacy storage resolution
//! - [`services`] - named services available to resolution
//! - [`config`] - binary configuration and its loader
//! - [`observability`] - tracing setup

pub mod config;
pub mod factory;
pub mod observability;
pub mod resolver;
pub mod services;

pub use factory::CryptoTokenServerFactory;
pub use resolver::{resolve, resolve_storage};
pub use services::{Service, ServiceLookup, ServiceRegistry};
