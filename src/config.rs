use serde::Deserialize;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::str::FromStr;

fn default_max_upload_bytes() -> usize {
    // 4 MB in bytes
    4 * 1024 * 1024
}

fn default_storage_quota_bytes() -> usize {
    // 5 MB, roughly what a browser grants one origin
    5 * 1024 * 1024
}

fn default_type_sample_rows() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: String,
    pub max_upload_bytes: usize,
    pub storage_quota_bytes: usize,
    pub type_sample_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_path: "listings.sqlite3".to_string(),
            max_upload_bytes: default_max_upload_bytes(),
            storage_quota_bytes: default_storage_quota_bytes(),
            type_sample_rows: default_type_sample_rows(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr)?,
            database_path: std::env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            storage_quota_bytes: env_or("STORAGE_QUOTA_BYTES", defaults.storage_quota_bytes)?,
            type_sample_rows: env_or("TYPE_SAMPLE_ROWS", defaults.type_sample_rows)?,
        })
    }

    /// `:memory:` keeps everything in process, nothing survives a restart.
    pub fn is_in_memory(&self) -> bool {
        self.database_path == ":memory:"
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::new()?;
    tracing::info!(
        "Loaded config: bind_addr={}, database_path={}, max_upload_bytes={}",
        config.bind_addr,
        config.database_path,
        config.max_upload_bytes
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_ceiling() {
        let config = Config::default();
        assert_eq!(config.max_upload_bytes, 4_194_304);
        assert_eq!(config.type_sample_rows, 50);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn env_or_falls_back_and_rejects_garbage() {
        std::env::remove_var("LISTING_TEST_UNSET");
        assert_eq!(env_or("LISTING_TEST_UNSET", 7usize).unwrap(), 7);

        std::env::set_var("LISTING_TEST_BAD", "lots");
        assert!(env_or::<usize>("LISTING_TEST_BAD", 7).is_err());

        std::env::set_var("LISTING_TEST_GOOD", " 12 ");
        assert_eq!(env_or::<usize>("LISTING_TEST_GOOD", 7).unwrap(), 12);
    }
}
