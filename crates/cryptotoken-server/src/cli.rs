use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cryptotoken")]
#[command(about = "Issue and verify JWT access tokens for OAuth2 routes")]
#[command(version)]
#[command(
    after_help = "Route storage blocks may use an `adapter` (pdo, mongo) or `storage = \"memory\"`, \
                  an in-process storage that lives for one command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, env = "CRYPTOTOKEN_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the public signing key as a JWK
    Jwk,
    /// Issue an access token for a route
    Issue(IssueArgs),
    /// Verify an access token against a route
    Verify(VerifyArgs),
    /// Build the server for a route and show what was wired
    Check(RouteArgs),
}

#[derive(clap::Args)]
pub struct RouteArgs {
    /// Route the OAuth2 server is built for
    #[arg(short, long, default_value = "/oauth")]
    pub route: String,
}

#[derive(clap::Args)]
pub struct IssueArgs {
    #[command(flatten)]
    pub route: RouteArgs,
    /// Client the token is issued to
    #[arg(long)]
    pub client_id: String,
    /// Resource owner
    #[arg(long)]
    pub user_id: Option<String>,
    /// Space-separated scope
    #[arg(long)]
    pub scope: Option<String>,
    /// Also issue a refresh token
    #[arg(long)]
    pub refresh: bool,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub route: RouteArgs,
    /// The access token
    pub token: String,
}
