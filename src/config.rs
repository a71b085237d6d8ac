use anyhow::{bail, Context};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub jwt: JwtSettings,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    /// `None` means any origin may call the API.
    pub cors_origins: Option<Vec<String>>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from `lookup`, which returns the raw value of a
    /// variable or `None` when it is unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        if database_url.trim().is_empty() {
            bail!("DATABASE_URL cannot be empty");
        }

        let secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.is_empty() {
            bail!("JWT_SECRET cannot be empty");
        }

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "PORT", 5000)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            jwt: JwtSettings {
                secret,
                ttl_days: parse_or(&lookup, "JWT_TTL_DAYS", 7)?,
            },
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            upload_max_bytes: parse_or(&lookup, "UPLOAD_MAX_BYTES", 5 * 1024 * 1024)?,
            cors_origins: lookup("CORS_ORIGINS").and_then(|raw| split_origins(&raw)),
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn split_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect();

    if origins.is_empty() {
        None
    } else {
        Some(origins)
    }
}
