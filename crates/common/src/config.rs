//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables (optionally seeded
//! from a `.env` file) so deployments differ only in their environment.

use anyhow::Result;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-store-call deadline
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Default HTTP port
const DEFAULT_PORT: u16 = 3000;

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection URL; `None` runs against the in-memory stores
    pub database_url: Option<String>,

    /// HS256 secret used to verify identity tokens
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,

    /// JSON list of participant profiles loaded into the in-memory directory
    pub directory_seed_file: Option<PathBuf>,

    /// Deadline applied to every individual store call
    pub store_timeout: Duration,

    /// Runtime configuration
    pub log_format: LogFormat,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET is required"))?;
        if jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let store_timeout_ms = match env::var("STORE_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("STORE_TIMEOUT_MS must be an integer, got {raw:?}"))?,
            Err(_) => DEFAULT_STORE_TIMEOUT_MS,
        };

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port, got {raw:?}"))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret,
            jwt_issuer: env::var("JWT_ISSUER").ok(),
            jwt_audience: env::var("JWT_AUDIENCE").ok(),
            directory_seed_file: env::var("DIRECTORY_SEED_FILE").ok().map(PathBuf::from),
            store_timeout: Duration::from_millis(store_timeout_ms),
            log_format: parse_log_format(env::var("LOG_FORMAT").ok().as_deref()),
            port,
        })
    }
}

fn parse_log_format(raw: Option<&str>) -> LogFormat {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}
