//! End-to-end server builds through `CryptoTokenServerFactory`.

mod common;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::{CountingFactory, CountingLookup, RecordingStorage, config, write_keys};
use cryptotoken_auth::config::{KeysConfig, StorageBlock};
use cryptotoken_auth::error::AuthError;
use cryptotoken_auth::keys::{KeyKind, KeyPair};
use cryptotoken_auth::server::ServerFactory;
use cryptotoken_auth::storage::{
    AccessTokenRecord, Capability, LegacyStorage, MemoryStorage, OAuthStorage,
};
use cryptotoken_auth::token::{
    AccessTokenRequest, JwtAccessTokenClaims, JwtAccessTokenStorage, TOKEN_RESPONSE_TYPE,
};
use cryptotoken_server::{CryptoTokenServerFactory, ServiceLookup, ServiceRegistry, resolve_storage};
use tempfile::TempDir;

const ISSUER: &str = "https://auth.example";

const INJECTED: &str = r#"
inject_existing_storage = true

[token]
issuer = "https://auth.example"
access_lifetime = "10m"

[authentication.adapters.oauth.storage]
route = "/oauth"
storage = "legacy"
"#;

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn lookup_with(storage: Arc<dyn OAuthStorage>) -> Arc<CountingLookup> {
    let mut lookup = CountingLookup::default();
    lookup.registry.register_storage("legacy", storage);
    Arc::new(lookup)
}

fn factory(
    keys: KeysConfig,
    toml_src: &str,
    lookup: Arc<dyn ServiceLookup>,
) -> (CryptoTokenServerFactory<CountingFactory>, CountingFactory) {
    let inner = CountingFactory::default();
    let factory = CryptoTokenServerFactory::new(inner.clone(), config(keys, toml_src), lookup);
    (factory, inner)
}

// ============================================================================
// Token round trip
// ============================================================================

#[tokio::test]
async fn test_issued_token_round_trips() {
    let dir = TempDir::new().unwrap();
    let (factory, _) = factory(
        write_keys(dir.path()),
        INJECTED,
        lookup_with(RecordingStorage::new("legacy")),
    );
    let server = factory.create("/oauth").await.unwrap();

    let request = AccessTokenRequest::new("web").user("alice").scope("read write");
    let issued_at = now();
    let response = server
        .response_type(TOKEN_RESPONSE_TYPE)
        .unwrap()
        .create_access_token(&request)
        .await
        .unwrap();
    assert_eq!(response.expires_in, 600);

    let record = server
        .storage(Capability::AccessToken)
        .unwrap()
        .get_access_token(&response.access_token)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.access_token, response.access_token);
    assert_eq!(record.client_id, "web");
    assert_eq!(record.user_id.as_deref(), Some("alice"));
    assert_eq!(record.scope.as_deref(), Some("read write"));
    assert!((issued_at + 600..=now() + 600).contains(&record.expires));
}

#[tokio::test]
async fn test_expired_token_is_not_found() {
    let dir = TempDir::new().unwrap();
    let keys = write_keys(dir.path());
    let (factory, _) = factory(
        keys.clone(),
        INJECTED,
        lookup_with(RecordingStorage::new("legacy")),
    );
    let server = factory.create("/oauth").await.unwrap();
    let storage = server.storage(Capability::AccessToken).unwrap();

    let signer = JwtAccessTokenStorage::new(Arc::new(KeyPair::load(&keys).unwrap()), None)
        .with_issuer(ISSUER);

    let mut claims = JwtAccessTokenClaims::new(ISSUER, "web", None, None, Duration::from_secs(60));
    let valid = signer.encode_claims(&claims).unwrap();
    assert!(storage.get_access_token(&valid).await.unwrap().is_some());

    claims.iat -= 120;
    claims.exp = claims.iat + 60;
    let expired = signer.encode_claims(&claims).unwrap();
    assert!(storage.get_access_token(&expired).await.unwrap().is_none());
}

#[tokio::test]
async fn test_token_signed_with_other_key_is_not_found() {
    let dir = TempDir::new().unwrap();
    let other_dir = TempDir::new().unwrap();
    let (factory, _) = factory(
        write_keys(dir.path()),
        INJECTED,
        lookup_with(RecordingStorage::new("legacy")),
    );
    let server = factory.create("/oauth").await.unwrap();

    let forger = JwtAccessTokenStorage::new(
        Arc::new(KeyPair::load(&write_keys(other_dir.path())).unwrap()),
        None,
    )
    .with_issuer(ISSUER);
    let forged = forger
        .issue("web", Some("mallory"), None, Duration::from_secs(600))
        .unwrap();

    let storage = server.storage(Capability::AccessToken).unwrap();
    assert!(storage.get_access_token(&forged).await.unwrap().is_none());
    assert!(storage.get_access_token("not-a-jwt").await.unwrap().is_none());
}

#[tokio::test]
async fn test_access_tokens_are_never_persisted() {
    let dir = TempDir::new().unwrap();
    let memory = Arc::new(MemoryStorage::new());
    let (factory, _) = factory(write_keys(dir.path()), INJECTED, lookup_with(memory.clone()));
    let server = factory.create("/oauth").await.unwrap();
    let storage = server.storage(Capability::AccessToken).unwrap();

    let record = AccessTokenRecord {
        access_token: "opaque".to_string(),
        client_id: "web".to_string(),
        user_id: None,
        expires: now() + 60,
        scope: None,
        jti: None,
    };
    storage.set_access_token(&record).await.unwrap();
    assert!(!storage.unset_access_token("opaque").await.unwrap());
    assert_eq!(memory.access_token_count().await, 0);
}

// ============================================================================
// Legacy delegate wiring
// ============================================================================

#[tokio::test]
async fn test_injection_disabled_never_touches_lookup() {
    let dir = TempDir::new().unwrap();
    let lookup = lookup_with(RecordingStorage::new("legacy"));
    let toml_src = INJECTED.replace(
        "inject_existing_storage = true",
        "inject_existing_storage = false",
    );
    let (factory, inner) = factory(write_keys(dir.path()), &toml_src, Arc::clone(&lookup) as _);

    let server = factory.create("/oauth").await.unwrap();
    assert_eq!(lookup.calls(), 0);
    assert_eq!(inner.created(), 1);

    let storage = server.storage(Capability::AccessToken).unwrap();
    assert!(!storage.supports(Capability::Client));

    let err = storage.get_client_details("web").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::UnsupportedOperation {
            capability: Capability::Client
        }
    ));
    let err = storage.scope_exists("read").await.unwrap_err();
    assert!(matches!(err, AuthError::UnsupportedOperation { .. }));
}

#[tokio::test]
async fn test_other_capabilities_forwarded_unchanged() {
    let dir = TempDir::new().unwrap();
    let legacy = RecordingStorage::new("legacy");
    let lookup = lookup_with(legacy.clone());
    let (factory, _) = factory(write_keys(dir.path()), INJECTED, Arc::clone(&lookup) as _);

    let server = factory.create("/oauth").await.unwrap();
    assert!(lookup.calls() > 0);

    let storage = server.storage(Capability::AccessToken).unwrap();
    assert!(storage.supports(Capability::Client));
    assert!(!storage.supports(Capability::RefreshToken));

    assert!(storage
        .check_client_credentials("web", Some("s3cret"))
        .await
        .unwrap());
    assert!(!storage.check_client_credentials("web", None).await.unwrap());
    let details = storage.get_client_details("web").await.unwrap().unwrap();
    assert_eq!(details.scope.as_deref(), Some("legacy.read"));

    assert_eq!(
        legacy.calls(),
        vec![
            r#"check_client_credentials(web, Some("s3cret"))"#.to_string(),
            "check_client_credentials(web, None)".to_string(),
            "get_client_details(web)".to_string(),
        ]
    );

    let err = storage.get_refresh_token("abc").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::UnsupportedOperation {
            capability: Capability::RefreshToken
        }
    ));
}

#[tokio::test]
async fn test_unconfigured_route_gets_no_delegate() {
    let dir = TempDir::new().unwrap();
    let lookup = lookup_with(RecordingStorage::new("legacy"));
    let (factory, _) = factory(write_keys(dir.path()), INJECTED, Arc::clone(&lookup) as _);

    let server = factory.create("/other").await.unwrap();
    assert_eq!(server.route(), "/other");
    assert_eq!(lookup.calls(), 0);

    let storage = server.storage(Capability::AccessToken).unwrap();
    assert!(storage.get_client_scope("web").await.is_err());
}

#[tokio::test]
async fn test_last_matching_route_wins() {
    let dir = TempDir::new().unwrap();
    let other = RecordingStorage::new("other");
    let first = RecordingStorage::new("first");
    let second = RecordingStorage::new("second");

    let mut lookup = CountingLookup::default();
    lookup
        .registry
        .register_storage("svc.other", other.clone())
        .register_storage("svc.first", first.clone())
        .register_storage("svc.second", second.clone());

    let (factory, _) = factory(
        write_keys(dir.path()),
        r#"
        inject_existing_storage = true

        [authentication.adapters.other.storage]
        route = "/other"
        storage = "svc.other"

        [authentication.adapters.no_storage]
        adapter = "http_basic"

        [authentication.adapters.first.storage]
        route = "/oauth"
        storage = "svc.first"

        [authentication.adapters.second.storage]
        route = "/oauth"
        storage = "svc.second"
        "#,
        Arc::new(lookup),
    );

    let server = factory.create("/oauth").await.unwrap();
    let storage = server.storage(Capability::AccessToken).unwrap();
    let scope = storage.get_default_scope(Some("web")).await.unwrap();

    assert_eq!(scope.as_deref(), Some("second"));
    assert_eq!(second.calls(), vec![r#"get_default_scope(Some("web"))"#.to_string()]);
    assert!(first.calls().is_empty());
    assert!(other.calls().is_empty());
}

#[tokio::test]
async fn test_refresh_token_issued_through_existing_storage() {
    let dir = TempDir::new().unwrap();
    let memory = Arc::new(MemoryStorage::new());
    let (factory, _) = factory(write_keys(dir.path()), INJECTED, lookup_with(memory.clone()));
    let server = factory.create("/oauth").await.unwrap();

    let request = AccessTokenRequest::new("web").user("alice").with_refresh_token();
    let response = server
        .response_type(TOKEN_RESPONSE_TYPE)
        .unwrap()
        .create_access_token(&request)
        .await
        .unwrap();

    let refresh = response.refresh_token.unwrap();
    let stored = server
        .storage(Capability::AccessToken)
        .unwrap()
        .get_refresh_token(&refresh)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.client_id, "web");
    assert_eq!(memory.refresh_token_count().await, 1);
}

#[tokio::test]
async fn test_each_build_gets_fresh_wiring() {
    let dir = TempDir::new().unwrap();
    let (factory, inner) = factory(
        write_keys(dir.path()),
        INJECTED,
        lookup_with(RecordingStorage::new("legacy")),
    );

    let a = factory.create("/oauth").await.unwrap();
    let b = factory.create("/oauth").await.unwrap();
    assert_eq!(inner.created(), 2);
    assert!(!Arc::ptr_eq(
        a.storage(Capability::AccessToken).unwrap(),
        b.storage(Capability::AccessToken).unwrap()
    ));
}

// ============================================================================
// Build failures
// ============================================================================

#[tokio::test]
async fn test_missing_key_file_aborts_before_server_creation() {
    let dir = TempDir::new().unwrap();
    let keys = write_keys(dir.path());

    let cases = [
        (
            KeysConfig {
                public_key: None,
                ..keys.clone()
            },
            KeyKind::Public,
        ),
        (
            KeysConfig {
                private_key: Some(dir.path().join("missing.pem")),
                ..keys.clone()
            },
            KeyKind::Private,
        ),
    ];

    for (keys, expected) in cases {
        let lookup = lookup_with(RecordingStorage::new("legacy"));
        let (factory, inner) = factory(keys, INJECTED, Arc::clone(&lookup) as _);

        let err = factory.create("/oauth").await.unwrap_err();
        assert!(
            matches!(err, AuthError::MissingKeyFile { key, .. } if key == expected),
            "unexpected error: {err}"
        );
        assert_eq!(inner.created(), 0);
        assert_eq!(lookup.calls(), 0);
    }
}

#[tokio::test]
async fn test_storage_config_errors_abort_build() {
    let dir = TempDir::new().unwrap();
    let keys = write_keys(dir.path());

    let cases = [
        (r#"adapter = "pdo""#, "MissingDsn"),
        (r#"adapter = "carrierpigeon""#, "InvalidAdapterType"),
        (r#"adapter = "mongo""#, "MissingDatabaseConfig"),
        (r#"dsn = "postgres://localhost/oauth""#, "MissingStorageConfig"),
        (r#"storage = "nowhere""#, "ServiceNotFound"),
    ];

    for (block, expected) in cases {
        let toml_src = format!(
            "inject_existing_storage = true\n\n[authentication.adapters.oauth.storage]\nroute = \"/oauth\"\n{block}\n"
        );
        let (factory, inner) = factory(keys.clone(), &toml_src, Arc::new(ServiceRegistry::new()));

        let err = factory.create("/oauth").await.unwrap_err();
        let matched = match expected {
            "MissingDsn" => matches!(err, AuthError::MissingDsn),
            "InvalidAdapterType" => {
                matches!(err, AuthError::InvalidAdapterType { ref adapter } if adapter == "carrierpigeon")
            }
            "MissingDatabaseConfig" => matches!(err, AuthError::MissingDatabaseConfig),
            "MissingStorageConfig" => matches!(err, AuthError::MissingStorageConfig),
            "ServiceNotFound" => {
                matches!(err, AuthError::ServiceNotFound { ref name } if name == "nowhere")
            }
            _ => unreachable!(),
        };
        assert!(matched, "{block}: expected {expected}, got {err}");
        assert!(err.is_fatal());
        assert_eq!(inner.created(), 0);
    }
}

// ============================================================================
// Service references
// ============================================================================

#[tokio::test]
async fn test_service_list_becomes_positional_mapping() {
    let svc_a: Arc<dyn OAuthStorage> = RecordingStorage::new("a");
    let svc_b: Arc<dyn OAuthStorage> = RecordingStorage::new("b");
    let mut registry = ServiceRegistry::new();
    registry
        .register_storage("svcA", Arc::clone(&svc_a))
        .register_storage("svcB", Arc::clone(&svc_b));

    let block: StorageBlock = toml::from_str(r#"storage = ["svcA", "svcB"]"#).unwrap();
    let legacy = resolve_storage(&block, &registry).await.unwrap();

    assert!(matches!(legacy, LegacyStorage::Named(_)));
    assert_eq!(legacy.len(), 2);
    assert!(Arc::ptr_eq(legacy.get("0").unwrap(), &svc_a));
    assert!(Arc::ptr_eq(legacy.get("1").unwrap(), &svc_b));
}
