use anyhow::{Context, Result, bail};
use chrono::{TimeDelta, Utc};
use std::path::PathBuf;

use shelf_api::books::GOOGLE_BOOKS_API;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub token_ttl: TimeDelta,
    pub books_api_base: String,
    pub books_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("SHELF_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SHELF_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = var("SHELF_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("SHELF_PORT must be a port number")?;
        let token_ttl_days: i64 = var("SHELF_TOKEN_TTL_DAYS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("SHELF_TOKEN_TTL_DAYS must be a whole number of days")?;
        if token_ttl_days <= 0 {
            bail!("SHELF_TOKEN_TTL_DAYS must be positive");
        }
        // Tokens expire at now + ttl, which must stay a representable date
        let token_ttl = match TimeDelta::try_days(token_ttl_days) {
            Some(ttl) if Utc::now().checked_add_signed(ttl).is_some() => ttl,
            _ => bail!("SHELF_TOKEN_TTL_DAYS is too large"),
        };

        Ok(Self {
            jwt_secret,
            db_path: var("SHELF_DB_PATH").unwrap_or_else(|| "shelf.db".into()).into(),
            host: var("SHELF_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            token_ttl,
            books_api_base: var("SHELF_BOOKS_API_BASE").unwrap_or_else(|| GOOGLE_BOOKS_API.into()),
            books_api_key: var("GOOGLE_BOOKS_API_KEY").filter(|k| !k.is_empty()),
        })
    }
}
