//! Runtime configuration read from the environment.

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub database_max_connections: u32,
    pub discount_cache_ttl: Duration,
    pub cache_warm_interval: Duration,
}

impl Config {
    /// Load from process environment (after `.env` has been applied)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let warm_secs: u64 = parse_or(&lookup, "CACHE_WARM_INTERVAL_SECS", 600)?;
        if warm_secs == 0 {
            bail!("CACHE_WARM_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            database_url,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            discount_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "DISCOUNT_CACHE_TTL_SECS",
                300,
            )?),
            cache_warm_interval: Duration::from_secs(warm_secs),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
