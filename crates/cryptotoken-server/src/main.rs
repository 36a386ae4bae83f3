mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cryptotoken_auth::server::{BasicOAuthServer, ServerFactory, ServerFn};
use cryptotoken_auth::storage::{Capability, MemoryStorage};
use cryptotoken_auth::token::{AccessTokenRequest, TOKEN_RESPONSE_TYPE};
use cryptotoken_auth::{AuthError, KeyPair};
use cryptotoken_server::config::{ServerConfig, loader};
use cryptotoken_server::observability;
use cryptotoken_server::{CryptoTokenServerFactory, ServiceRegistry};

use cli::{Cli, Commands};

/// Service name under which the binary registers an in-process storage.
const MEMORY_SERVICE: &str = "memory";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        for line in error_report(&e) {
            eprintln!("{line}");
        }
        std::process::exit(1);
    }
}

/// Lines printed for a failed command.
fn error_report(err: &anyhow::Error) -> Vec<String> {
    let mut lines = vec![format!("error: {err:#}")];
    if let Some(auth) = err.downcast_ref::<AuthError>() {
        lines.push(format!(
            "  category: {} (oauth error: {}{})",
            auth.category(),
            auth.oauth_error_code(),
            if auth.is_fatal() { ", fatal" } else { "" }
        ));
        if auth.is_storage_config_error() {
            lines.push(format!(
                "  hint: this binary registers only the `{MEMORY_SERVICE}` service; \
                 use an `adapter` block or `storage = \"{MEMORY_SERVICE}\"`"
            ));
        }
    }
    lines
}

/// Services available to `storage` references in route blocks.
fn services() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry.register_storage(MEMORY_SERVICE, Arc::new(MemoryStorage::new()));
    registry
}

async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = loader::load_config(cli.config.as_deref()).context("loading configuration")?;
    observability::init_tracing_with_level(&config.logging.level);

    match &cli.command {
        Commands::Jwk => {
            let keys = KeyPair::load(&config.cryptotoken.keys)?;
            println!("{}", serde_json::to_string_pretty(&keys.to_jwk()?)?);
        }
        Commands::Issue(args) => {
            let server = build_server(config, &args.route.route).await?;
            let response_type = server
                .response_type(TOKEN_RESPONSE_TYPE)
                .context("no token response type registered")?;

            let mut request = AccessTokenRequest::new(&args.client_id);
            if let Some(user_id) = &args.user_id {
                request = request.user(user_id);
            }
            if let Some(scope) = &args.scope {
                request = request.scope(scope);
            }
            if args.refresh {
                request = request.with_refresh_token();
            }

            let response = response_type.create_access_token(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Verify(args) => {
            let server = build_server(config, &args.route.route).await?;
            let storage = server
                .storage(Capability::AccessToken)
                .context("no access token storage registered")?;

            match storage.get_access_token(&args.token).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => anyhow::bail!("access token is invalid or expired"),
            }
        }
        Commands::Check(args) => {
            let server = build_server(config, &args.route).await?;
            println!("{server:#?}");
        }
    }

    Ok(())
}

async fn build_server(config: ServerConfig, route: &str) -> Result<BasicOAuthServer> {
    let factory = CryptoTokenServerFactory::new(
        ServerFn(|route: &str| Ok::<_, AuthError>(BasicOAuthServer::new(route))),
        Arc::new(config.cryptotoken),
        Arc::new(services()),
    );
    let server = factory
        .create(route)
        .await
        .with_context(|| format!("building OAuth2 server for route {route}"))?;
    Ok(server)
}
