//! ejabberd-probe entry point
//!
//! Loads the JWK, mints a token for the test user, then runs the admin API
//! probes in order and prints one line per probe.

use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use probe_lib::{AdminClient, ProbeConfig, ProbeSuite};

/// Characters of the token shown in the banner
const TOKEN_PREVIEW_LEN: usize = 50;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ejabberd_probe=info,probe_lib=info,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = ProbeConfig::from_env().context("Failed to load configuration")?;
    tracing::debug!("Configuration: {:?}", config);

    println!("🧪 Testing JWT authentication with ejabberd");
    println!("{}", "=".repeat(50));

    let minter = config
        .token_minter()
        .context("Failed to load signing key from JWT_JWK_B64")?;
    println!(
        "✅ Loaded secret (len={} bytes), kid={}",
        minter.key().len(),
        minter.key().kid().unwrap_or("None")
    );

    let user_jid = config.user_jid().context("Invalid test user")?;
    let token = minter
        .mint(user_jid.as_str())
        .context("Failed to mint token")?;

    // The token must verify with our own key before the server sees it
    let decoded = minter.verify(&token).context("Minted token failed self-check")?;
    println!(
        "✅ Generated JWT for {} (exp={}): {}...",
        decoded.claims.identity,
        decoded.claims.exp,
        &token[..token.len().min(TOKEN_PREVIEW_LEN)]
    );

    println!("\n🌐 Testing against {}", config.base_url());

    let client = AdminClient::from_config(&config)?;
    let suite = ProbeSuite::new(&config, client, token.clone())?;
    let report = suite
        .run_with(|outcome| println!("{}", outcome.summary_line()))
        .await;

    println!("\n📋 {}", report.summary());
    println!("Use JWT token for authentication: {}", token);

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
