//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cryptotoken_auth::config::{CryptoTokenConfig, KeysConfig};
use cryptotoken_auth::keys::SigningAlgorithm;
use cryptotoken_auth::server::{BasicOAuthServer, ServerFactory};
use cryptotoken_auth::storage::{Capability, ClientDetails, OAuthStorage};
use cryptotoken_auth::AuthResult;
use cryptotoken_server::services::{Service, ServiceLookup, ServiceRegistry};
use p384::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;

/// Writes a fresh ES384 key pair into `dir`.
pub fn write_keys(dir: &Path) -> KeysConfig {
    let secret = p384::SecretKey::random(&mut OsRng);
    let private_pem = secret.to_pkcs8_pem(LineEnding::LF).unwrap();
    let public_pem = secret.public_key().to_public_key_pem(LineEnding::LF).unwrap();

    let public = dir.join("public.pem");
    let private = dir.join("private.pem");
    std::fs::write(&public, public_pem).unwrap();
    std::fs::write(&private, private_pem.as_bytes()).unwrap();

    KeysConfig {
        public_key: Some(public),
        private_key: Some(private),
        algorithm: SigningAlgorithm::ES384,
    }
}

/// Parses a config and points it at `keys`.
pub fn config(keys: KeysConfig, toml_src: &str) -> Arc<CryptoTokenConfig> {
    let mut cfg: CryptoTokenConfig = toml::from_str(toml_src).unwrap();
    cfg.keys = keys;
    Arc::new(cfg)
}

/// Server factory that counts how often it was asked for a server.
#[derive(Debug, Clone, Default)]
pub struct CountingFactory {
    pub created: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServerFactory for CountingFactory {
    type Server = BasicOAuthServer;

    async fn create(&self, route: &str) -> AuthResult<BasicOAuthServer> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(BasicOAuthServer::new(route))
    }
}

/// Service lookup that counts calls before forwarding to a registry.
#[derive(Debug, Default)]
pub struct CountingLookup {
    pub registry: ServiceRegistry,
    pub calls: AtomicUsize,
}

impl CountingLookup {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ServiceLookup for CountingLookup {
    fn has(&self, name: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.registry.has(name)
    }

    fn get(&self, name: &str) -> AuthResult<Service> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.registry.get(name)
    }
}

/// Storage that records every call it receives.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    pub name: String,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingStorage {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl OAuthStorage for RecordingStorage {
    fn supports(&self, capability: Capability) -> bool {
        matches!(
            capability,
            Capability::Client | Capability::ClientCredentials | Capability::Scope
        )
    }

    async fn check_client_credentials(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<bool> {
        self.record(format!("check_client_credentials({client_id}, {client_secret:?})"));
        Ok(client_secret == Some("s3cret"))
    }

    async fn get_client_details(&self, client_id: &str) -> AuthResult<Option<ClientDetails>> {
        self.record(format!("get_client_details({client_id})"));
        let mut details = ClientDetails::new(client_id);
        details.scope = Some(format!("{}.read", self.name));
        Ok(Some(details))
    }

    async fn get_default_scope(&self, client_id: Option<&str>) -> AuthResult<Option<String>> {
        self.record(format!("get_default_scope({client_id:?})"));
        Ok(Some(self.name.clone()))
    }
}
