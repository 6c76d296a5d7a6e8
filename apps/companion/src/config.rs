use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::companion::DEFAULT_NARRATION_TIMEOUT;

const DEFAULT_AUDIO_CACHE_DIR: &str = "./data/audio";
const DEFAULT_AUDIO_CACHE_MAX_BYTES: u64 = 256 * 1024 * 1024;

/// Where cached audio goes when `S3_BUCKET` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Only the model API key is required; every backend falls back to a local
/// default when its variables are absent.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_base_url: Option<String>,
    /// Local key-value store. In-memory when unset.
    pub redis_url: Option<String>,
    /// Remote document store and auth. Local-only mode when unset.
    pub database_url: Option<String>,
    pub audio_cache_dir: PathBuf,
    pub audio_cache_max_bytes: u64,
    pub s3: Option<S3Config>,
    pub narration_timeout: Duration,
    pub sync_outbox: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let s3 = match var("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: var("S3_ENDPOINT"),
                region: var("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        Ok(Config {
            gemini_api_key: require("GEMINI_API_KEY")?,
            gemini_base_url: var("GEMINI_BASE_URL"),
            redis_url: var("REDIS_URL"),
            database_url: var("DATABASE_URL"),
            audio_cache_dir: var("AUDIO_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIO_CACHE_DIR)),
            audio_cache_max_bytes: parse_or(
                var("AUDIO_CACHE_MAX_BYTES"),
                "AUDIO_CACHE_MAX_BYTES",
                DEFAULT_AUDIO_CACHE_MAX_BYTES,
            )?,
            s3,
            narration_timeout: Duration::from_secs(parse_or(
                var("NARRATION_TIMEOUT_SECS"),
                "NARRATION_TIMEOUT_SECS",
                DEFAULT_NARRATION_TIMEOUT.as_secs(),
            )?),
            sync_outbox: parse_flag(var("SYNC_OUTBOX"), "SYNC_OUTBOX")?,
            port: parse_or(var("PORT"), "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>, key: &str) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{key} must be a boolean, got '{v}'"),
        },
    }
}
