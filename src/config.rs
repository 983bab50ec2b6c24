use std::time::Duration;

use crate::sync::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the notification store (no trailing `/api/v1`).
    pub store_url: String,
    pub api_key: Option<String>,
    /// Seconds between polls. Set via PORTAL_POLL_INTERVAL_SECS. Default: 30.
    pub poll_interval_secs: u64,
    /// Per-request timeout for store calls. Default: 10.
    pub request_timeout_secs: u64,
    /// Port for the dev store server.
    pub port: u16,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from any key lookup. `load` passes the process environment.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    let poll_interval_secs = parse_or(
        &lookup,
        "PORTAL_POLL_INTERVAL_SECS",
        DEFAULT_POLL_INTERVAL.as_secs(),
    )?;
    if poll_interval_secs == 0 {
        anyhow::bail!("PORTAL_POLL_INTERVAL_SECS must be greater than zero");
    }

    Ok(Config {
        store_url: lookup("PORTAL_STORE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "http://127.0.0.1:8787".into()),
        api_key: lookup("PORTAL_API_KEY").filter(|v| !v.trim().is_empty()),
        poll_interval_secs,
        request_timeout_secs: parse_or(&lookup, "PORTAL_REQUEST_TIMEOUT_SECS", 10)?,
        port: parse_or(&lookup, "PORTAL_PORT", 8787)?,
    })
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        _ => Ok(default),
    }
}
