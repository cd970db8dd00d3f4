//! Account CLI - Session, entitlement and login URL tools.
//!
//! # Usage
//!
//! ```bash
//! # Show the current session (cached in .account-cache.json)
//! account-cli session
//!
//! # Logged-in / connected / token summary
//! account-cli status
//!
//! # Check product access for a user
//! account-cli has-access --user-id 42 premium sports
//!
//! # Build a login URL for the legacy flow
//! account-cli login-url --state abc --legacy
//! ```
//!
//! # Commands
//!
//! - `session` / `user` / `status` - Session lookups
//! - `has-access` / `clear-access` - Entitlement checks
//! - `login-url` / `logout-url` - URL building
//! - `logout` - End the session on both backends
//!
//! Configuration comes from `ACCOUNT_*` environment variables (see
//! `account_sdk::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "account-cli")]
#[command(author, version, about = "Account SDK command-line tools")]
struct Cli {
    /// File holding cached sessions and access results between runs
    #[arg(long, global = true, default_value = ".account-cache.json")]
    cache_file: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the current session
    Session {
        /// Do not ask the backend to log in silently
        #[arg(long)]
        no_autologin: bool,
    },
    /// Show the connected user
    User,
    /// Show logged-in and connected flags and the session token
    Status,
    /// Check whether a user is entitled to any of the given products
    HasAccess {
        #[arg(long)]
        user_id: String,

        /// Product ids
        #[arg(required = true)]
        products: Vec<String>,
    },
    /// Forget a cached access result
    ClearAccess {
        #[arg(long)]
        user_id: String,

        #[arg(required = true)]
        products: Vec<String>,
    },
    /// Build a login URL
    LoginUrl {
        /// Value echoed back to the redirect URI (default: random)
        #[arg(long)]
        state: Option<String>,

        /// `otp-email` or `otp-sms`
        #[arg(long, default_value = "")]
        acr_values: String,

        #[arg(long, default_value = "openid")]
        scope: String,

        #[arg(long, default_value = "")]
        login_hint: String,

        #[arg(long)]
        redirect_uri: Option<String>,

        /// Use the legacy login flow
        #[arg(long)]
        legacy: bool,
    },
    /// Build a logout URL
    LogoutUrl {
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Log out of both backends
    Logout,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json);

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "account_sdk=info,account_cli=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let ctx = commands::Context::load(&cli.cache_file)?;

    match cli.command {
        Commands::Session { no_autologin } => commands::session::show(&ctx, !no_autologin).await?,
        Commands::User => commands::session::user(&ctx).await?,
        Commands::Status => commands::session::status(&ctx).await?,
        Commands::Logout => commands::session::logout(&ctx).await?,
        Commands::HasAccess { user_id, products } => {
            commands::access::has_access(&ctx, &products, &user_id).await?;
        }
        Commands::ClearAccess { user_id, products } => {
            commands::access::clear(&ctx, &products, &user_id)?;
        }
        Commands::LoginUrl {
            state,
            acr_values,
            scope,
            login_hint,
            redirect_uri,
            legacy,
        } => {
            let state = state.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
            let mut options = account_sdk::LoginOptions::new(state)
                .with_acr_values(acr_values)
                .with_scope(scope)
                .with_login_hint(login_hint);
            options.redirect_uri = redirect_uri;
            if legacy {
                options = options.legacy();
            }
            commands::urls::login_url(&ctx, &options)?;
        }
        Commands::LogoutUrl { redirect_uri } => {
            commands::urls::logout_url(&ctx, redirect_uri.as_deref())?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_has_access_collects_products() {
        let cli =
            Cli::try_parse_from(["account-cli", "has-access", "--user-id", "42", "b", "a"]).unwrap();
        match cli.command {
            Commands::HasAccess { user_id, products } => {
                assert_eq!(user_id, "42");
                assert_eq!(products, vec!["b", "a"]);
            }
            _ => panic!("expected has-access"),
        }
        assert_eq!(cli.cache_file, PathBuf::from(".account-cache.json"));
    }

    #[test]
    fn test_has_access_requires_products() {
        assert!(Cli::try_parse_from(["account-cli", "has-access", "--user-id", "42"]).is_err());
    }

    #[test]
    fn test_session_flags() {
        let cli = Cli::try_parse_from(["account-cli", "--json", "session", "--no-autologin"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Session { no_autologin: true }));
    }
}
