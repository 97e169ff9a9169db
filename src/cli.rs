//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{Database, NewUser};
use crate::password::hash_password;
use clap::Parser;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Environment variable holding the password for `--create-admin`.
pub const ADMIN_PASSWORD_ENV: &str = "AUTHGATE_ADMIN_PASSWORD";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "authgate",
    about = "Dual-token authentication service with session-backed browser login"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "authgate.db")]
    pub database: String,

    /// Service domain, used as token issuer and audience
    #[arg(long, default_value = "localhost")]
    pub domain: String,

    /// Pin the refresh cookie to this domain. Unset keeps it host-only, which browsers
    /// require for the `__Host-` prefix
    #[arg(long)]
    pub cookie_domain: Option<String>,

    /// Browser origin allowed to call the API with credentials. Repeat for several origins
    #[arg(long = "allowed-origin", value_name = "ORIGIN")]
    pub allowed_origins: Vec<String>,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Minimum seconds between refreshes of the same token chain (0 disables)
    #[arg(long, default_value = "0")]
    pub min_refresh_interval: u64,

    /// Login attempts allowed per minute per client IP (0 disables)
    #[arg(long, default_value = "10")]
    pub login_attempts_per_minute: u32,

    /// Take the client IP from X-Forwarded-For (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Where unauthenticated browsers are redirected
    #[arg(long, default_value = "/login", value_parser = validate_login_path)]
    pub login_path: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Create an admin user with this email on startup. Password is read from AUTHGATE_ADMIN_PASSWORD
    #[arg(long, value_name = "EMAIL")]
    pub create_admin: Option<String>,
}

fn validate_login_path(s: &str) -> Result<String, String> {
    if !s.starts_with('/') {
        return Err(format!("Login path must start with '/': {}", s));
    }

    if s.chars().any(|c| !c.is_ascii() || c.is_whitespace()) {
        return Err(format!("Login path contains invalid characters: {}", s));
    }

    Ok(s.to_string())
}

/// Initialize logging based on the specified format. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Handle the --create-admin flag: create the admin, or promote an existing account with that email.
/// Returns false and logs an error on failure.
pub async fn handle_create_admin(db: &Database, email: &str) -> bool {
    match db.users().get_by_email(email).await {
        Ok(Some(existing)) => {
            if let Err(e) = db.users().set_admin(existing.id, true).await {
                error!(error = %e, "Failed to promote existing user");
                return false;
            }
            info!(user_id = existing.id, "Existing user promoted to admin");
            true
        }
        Ok(None) => {
            let Ok(password) = std::env::var(ADMIN_PASSWORD_ENV) else {
                error!("{} must be set to create an admin user", ADMIN_PASSWORD_ENV);
                return false;
            };
            // SAFETY: single-threaded startup, nothing else reads this variable.
            unsafe { std::env::remove_var(ADMIN_PASSWORD_ENV) };

            if password.is_empty() {
                error!("{} must not be empty", ADMIN_PASSWORD_ENV);
                return false;
            }

            let password_hash = match hash_password(&password) {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    return false;
                }
            };

            let new_user = NewUser {
                first_name: "Admin",
                last_name: "User",
                email,
                password_hash: &password_hash,
                is_admin: true,
            };
            match db.users().create(&new_user).await {
                Ok(id) => {
                    info!(user_id = id, "Admin user created");
                    true
                }
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    false
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            false
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        domain: args.domain.clone(),
        cookie_domain: args.cookie_domain.clone().filter(|d| !d.is_empty()),
        allowed_origins: args.allowed_origins.clone(),
        min_refresh_interval: Duration::from_secs(args.min_refresh_interval),
        login_path: args.login_path.clone(),
        login_rate_limit: NonZeroU32::new(args.login_attempts_per_minute),
        trust_forwarded_for: args.trust_forwarded_for,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
