use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Upper bound for the ttl and purge interval settings.
const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub thread_cache_ttl: Duration,
    pub cache_purge_interval: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Unset keys fall back to defaults,
    /// except the JWT secret which must be set to a real value.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("PARLEY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PARLEY_JWT_SECRET is unset or still a placeholder");
        }

        let port = match lookup("PARLEY_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid PARLEY_PORT {:?}", raw))?,
            None => 3000,
        };

        Ok(Self {
            db_path: lookup("PARLEY_DB_PATH").unwrap_or_else(|| "parley.db".into()).into(),
            host: lookup("PARLEY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt_secret,
            thread_cache_ttl: seconds(&lookup, "PARLEY_THREAD_CACHE_TTL_SECS", 60)?,
            cache_purge_interval: seconds(&lookup, "PARLEY_CACHE_PURGE_SECS", 300)?,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

fn seconds<F>(lookup: &F, key: &str, default: u64) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(key) {
        Some(raw) => raw.parse().with_context(|| format!("invalid {} {:?}", key, raw))?,
        None => default,
    };
    if secs == 0 || secs > MAX_INTERVAL_SECS {
        bail!("{} must be between 1 and {} seconds", key, MAX_INTERVAL_SECS);
    }
    Ok(Duration::from_secs(secs))
}
