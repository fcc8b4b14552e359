//! Process configuration
//!
//! Everything is read once at startup and passed down explicitly; nothing below
//! `main` reads the environment.

use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use std::env;
use std::path::{Path, PathBuf};

use crate::auth::jwt::DEFAULT_TTL_HOURS;

pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub port: u16,
    pub database_path: PathBuf,
}

impl AppConfig {
    /// Full server configuration; the signing secret is mandatory here.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET is not set");
        }

        Ok(Self {
            jwt_secret,
            jwt_expiration_hours: parse_ttl_hours(lookup("JWT_EXPIRATION_HOURS")),
            port: lookup("SERVER_PORT")
                .and_then(|v| v.trim().parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            database_path: database_path(&lookup)?,
        })
    }
}

/// Token lifetime in hours; absent, non-numeric or non-positive falls back to 72.
pub fn parse_ttl_hours(raw: Option<String>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|&h| h > 0)
        .unwrap_or(DEFAULT_TTL_HOURS)
}

/// SQLite database path from `DATABASE_URL`. Accepts a bare path or a `sqlite:` URL.
pub fn database_path(lookup: &impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    let raw = lookup("DATABASE_URL")
        .filter(|v| !v.trim().is_empty())
        .context("DATABASE_URL is not set")?;

    let trimmed = raw.trim();
    let path = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);

    Ok(PathBuf::from(path))
}

/// Load `.env` from the working directory (and parents), then from the crate root.
/// Returns whether any file was loaded; runs before logging is up.
pub fn load_env() -> bool {
    let mut loaded = dotenv().is_ok();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        loaded |= dotenv::from_path(&manifest_env).is_ok();
    }

    loaded
}
