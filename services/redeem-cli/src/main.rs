//! AFK Arena gift code redeemer
//!
//! Single-binary CLI that:
//! 1. Verifies the player with their in-game verification code
//! 2. Fetches every account linked to the player
//! 3. Redeems each given code for each account
//! 4. Prints which codes succeeded, were already used, expired, or invalid
//!
//! Exit codes: 0 on success, 2 when the API rejected a request, 1 otherwise.

mod cli;
mod error;
mod report;

use std::process::ExitCode;

use afk_account::{Player, RedemptionOutcome};
use afk_session::SessionDir;
use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Args, or_prompt};

/// Exit code when the API rejected a request
const EXIT_REQUEST_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Usage errors exit 1; 2 belongs to API rejections
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never mix with the report on stdout.
/// LOG_LEVEL / RUST_LOG select the filter, LOG_FORMAT=json the format.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config_path = Config::resolve_path(args.config.as_deref());
    let config = Config::load_or_default(config_path.as_deref()).with_context(|| {
        match &config_path {
            Some(path) => format!("failed to load config from {}", path.display()),
            None => "invalid configuration".to_string(),
        }
    })?;
    debug!(
        base_url = %config.api.base_url,
        session_dir = %config.session.dir.display(),
        "configuration loaded"
    );

    let sessions = SessionDir::new(&config.session.dir);
    if args.clear_sessions {
        sessions.clear_all().context("failed to clear saved sessions")?;
        println!("Cleared saved sessions in {}", sessions.path().display());
        if args.codes.is_empty() {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let uid = or_prompt(args.uid, "Your In-Game User ID")?;
    let auth = or_prompt(args.auth, "Your Verification Code")?;

    let player = Player::new(uid, &config.api, sessions)
        .with_context(|| format!("failed to open session for player {uid}"))?;

    match redeem_and_close(player, auth, &args.codes).await {
        Ok(outcome) => {
            print!("{}", report::render(&outcome));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => match rejection(&e) {
            Some((code, message)) => {
                info!(error = %e, "request rejected");
                eprintln!("{message}");
                Ok(ExitCode::from(code))
            }
            None => Err(e.into()),
        },
    }
}

/// Exit code and message for an API rejection. Anything else is `None` and
/// propagates as a plain error (exit 1).
fn rejection(e: &afk_session::Error) -> Option<(u8, String)> {
    let kind = e.kind()?;
    Some((EXIT_REQUEST_ERROR, format!("Error encountered: {kind}")))
}

/// Run the whole flow, releasing the player's transport whatever the result.
async fn redeem_and_close(
    mut player: Player,
    auth: u64,
    codes: &[String],
) -> afk_session::Result<RedemptionOutcome> {
    let result = redeem(&mut player, auth, codes).await;
    player.close();
    result
}

async fn redeem(
    player: &mut Player,
    auth: u64,
    codes: &[String],
) -> afk_session::Result<RedemptionOutcome> {
    println!("Verifying...");
    player.verify(auth).await?;
    println!("Fetching user data...");
    player.fetch_users().await?;
    println!("Redeeming codes:\n  {}", codes.join(", "));
    player.redeem_codes(codes).await
}
