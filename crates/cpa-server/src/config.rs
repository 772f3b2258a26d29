use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{info, warn};

use cpa_codeforces::client::DEFAULT_BASE_URL;

/// Placeholder JWT secrets that should never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub cf_api_url: String,
    /// Expected audience of Google ID tokens. Unset disables the check.
    pub google_client_id: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let jwt_secret = env::var("CPA_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            warn!("CPA_JWT_SECRET is unset or still a placeholder; tokens are forgeable");
        }

        Ok(Self {
            host: try_load("CPA_HOST", "0.0.0.0")?,
            port: try_load("CPA_PORT", "5001")?,
            db_path: try_load("CPA_DB_PATH", "cpa.db")?,
            jwt_secret,
            token_ttl_hours: try_load("CPA_TOKEN_TTL_HOURS", "6")?,
            cf_api_url: try_load("CPA_CF_API_URL", DEFAULT_BASE_URL)?,
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok().filter(|id| !id.is_empty()),
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e: T::Err| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value '{raw}'"))
}
