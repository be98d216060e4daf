use std::env;
use std::time::Duration;

use anyhow::Context;
use reqwest::Url;

pub const CACHE_TTL: Duration = Duration::from_secs(20);
pub const CACHE_MAX_ITEMS: usize = 512;

const DEFAULT_BIND: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheType {
    Lru,
    Memory,
}

impl std::str::FromStr for CacheType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(CacheType::Lru),
            "memory" => Ok(CacheType::Memory),
            other => Err(anyhow::anyhow!("Unknown cache backend specified: {other}!")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub cache_type: CacheType,
    pub api_key: String,
    pub api_host: String,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> anyhow::Result<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{name} is missing from the environment"))
        };

        let api_key = required("RAPIDAPI_KEY")?;
        let api_host = required("RAPIDAPI_HOST")?;

        let port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?,
            None => DEFAULT_PORT,
        };

        let cache_type = match lookup("CACHE_BACKEND") {
            Some(cache_type) => cache_type.trim().parse()?,
            None => CacheType::Lru,
        };

        Ok(Self {
            bind: lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port,
            cache_type,
            api_key,
            api_host,
        })
    }

    pub fn upstream_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&format!("https://{}", self.api_host))
            .with_context(|| format!("RAPIDAPI_HOST is not a valid host: {}", self.api_host))
    }
}
