//! generate-jwt: print a signed token for `<username>@<host>`.

use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::{ClaimsProfile, Jid, KeyMaterial, TokenMinter};

#[derive(Parser, Debug)]
#[command(
    name = "generate-jwt",
    version,
    about = "Mint an HS256 token for ejabberd JWT authentication"
)]
struct Cli {
    /// Local part of the JID
    username: String,

    /// XMPP domain
    #[arg(default_value = "localhost")]
    host: String,

    /// Base64-encoded JWK blob
    #[arg(long, env = "JWT_JWK_B64", hide_env_values = true, conflicts_with = "secret")]
    jwk: Option<String>,

    /// Base64url `k` value, used instead of a JWK
    #[arg(long, env = "JWT_SECRET_B64URL", hide_env_values = true)]
    secret: Option<String>,

    /// Claims profile: `middleware` (sub, iss, iat, nbf, 24h) or `xmpp` (jid, 1h)
    #[arg(long, default_value = "middleware")]
    profile: ClaimsProfile,

    /// Issuer for the middleware profile
    #[arg(long, env = "JWT_ISSUER", default_value = ClaimsProfile::DEFAULT_ISSUER)]
    issuer: String,

    /// Validity in seconds, overriding the profile default
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
    ttl: Option<i64>,
}

fn load_key(cli: &Cli) -> anyhow::Result<KeyMaterial> {
    match (&cli.jwk, &cli.secret) {
        (Some(jwk), _) => {
            KeyMaterial::from_jwk_b64(jwk).context("Failed to load signing key from JWT_JWK_B64")
        }
        (None, Some(secret)) => KeyMaterial::from_b64url_secret(secret)
            .context("Failed to load signing key from JWT_SECRET_B64URL"),
        (None, None) => anyhow::bail!(
            "no signing key: set JWT_JWK_B64 or JWT_SECRET_B64URL (or pass --jwk / --secret)"
        ),
    }
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let key = load_key(&cli)?;

    let mut profile = cli.profile.clone();
    if profile.issuer.is_some() {
        profile.issuer = Some(cli.issuer.clone());
    }
    if let Some(ttl) = cli.ttl {
        profile = profile.with_validity(ttl);
    }

    let identity = Jid::new(&cli.username, &cli.host).context("Invalid username or host")?;
    let minter = TokenMinter::new(key, profile).context("Failed to build token minter")?;
    minter
        .mint(identity.as_str())
        .with_context(|| format!("Failed to mint token for {}", identity))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    // stdout carries only the token
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(token) => {
            println!("{}", token);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
