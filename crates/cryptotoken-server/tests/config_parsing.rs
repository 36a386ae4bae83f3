use std::{env, fs};

use cryptotoken_auth::config::{ConfigError, StorageRefs};
use cryptotoken_auth::keys::SigningAlgorithm;
use cryptotoken_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("cryptotoken.toml");

    let toml_content = r#"
inject_existing_storage = true

[logging]
level = "debug"

[keys]
public_key = "/etc/oauth/public.pem"
private_key = "/etc/oauth/private.pem"
algorithm = "ES384"

[token]
issuer = "https://auth.example.com"
access_lifetime = "15m"

[authentication.adapters.oauth.storage]
route = "/oauth"
storage = ["svcA", "svcB"]

[authentication.adapters.legacy.storage]
route = "/legacy"
adapter = "pdo"
dsn = "pgsql:host=localhost;dbname=oauth"
username = "oauth"

[authentication.adapters.legacy.storage.storage_settings]
client_table = "clients"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.logging.level, "debug");
    let crypto = &cfg.cryptotoken;
    assert!(crypto.inject_existing_storage);
    assert_eq!(crypto.keys.algorithm, SigningAlgorithm::ES384);
    assert_eq!(crypto.token.access_lifetime.as_secs(), 900);

    let adapters: Vec<_> = crypto.authentication.adapters.keys().collect();
    assert_eq!(adapters, vec!["oauth", "legacy"]);
    let oauth = crypto.authentication.adapters["oauth"].storage.as_ref().unwrap();
    assert_eq!(
        oauth.storage,
        Some(StorageRefs::List(vec!["svcA".into(), "svcB".into()]))
    );
    let legacy = crypto.authentication.adapters["legacy"].storage.as_ref().unwrap();
    let settings = legacy.storage_settings.clone().unwrap();
    assert_eq!(settings.client_table, "clients");
    assert_eq!(settings.user_table, "oauth_users");

    // 2) Env override should win over file
    unsafe {
        env::set_var("CRYPTOTOKEN__TOKEN__ISSUER", "https://override.example.com");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(
        cfg_env.cryptotoken.token.issuer,
        "https://override.example.com"
    );
    unsafe {
        env::remove_var("CRYPTOTOKEN__TOKEN__ISSUER");
    }

    // 3) Zero access token lifetime should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[token]
access_lifetime = "0s"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(matches!(err, ConfigError::InvalidValue(ref msg) if msg.contains("access_lifetime")));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");

    let cfg = load_config(path.to_str()).expect("defaults should load");
    assert_eq!(cfg.logging.level, "info");
    assert!(!cfg.cryptotoken.inject_existing_storage);
    assert!(cfg.cryptotoken.keys.public_key.is_none());
}
