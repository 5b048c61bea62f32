//! Process configuration, read once from the environment at startup.
//!
//! `.env` is loaded by `main` before [`AppConfig::from_env`] runs. Only
//! `DATABASE_URL` is mandatory; everything else has a working default so a
//! local checkout boots without an LLM key or object storage credentials.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use crate::trends::TrendLimits;

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "mistralai/mistral-7b-instruct";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub store_timeout: Duration,
    pub llm: LlmConfig,
    pub suggestion_sample_size: usize,
    pub keyword_config_path: Option<PathBuf>,
    pub trend_limits: TrendLimits,
    pub storage: StorageConfig,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Absent key means every generation call falls back locally.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    /// S3-compatible endpoint (Supabase storage, MinIO). `None` uses AWS.
    pub endpoint: Option<String>,
    /// Base used to build public object URLs.
    pub public_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            database_url,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8000"),
            cors_origins: parse_list(&env_or("CORS_ORIGINS", "http://localhost:3000")),
            store_timeout: Duration::from_secs(env_parse("STORE_TIMEOUT_SECS", 10)),
            llm: LlmConfig {
                api_key: env_opt("OPENROUTER_API_KEY"),
                base_url: env_or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
                model: env_or("LLM_MODEL", DEFAULT_LLM_MODEL),
                timeout: Duration::from_secs(env_parse("LLM_TIMEOUT_SECS", 25)),
                max_tokens: env_parse("LLM_MAX_TOKENS", 400),
            },
            suggestion_sample_size: env_parse("SUGGESTION_SAMPLE_SIZE", 10),
            keyword_config_path: env_opt("KEYWORD_CONFIG_PATH").map(PathBuf::from),
            trend_limits: TrendLimits {
                positive: env_parse("TREND_TOP_POSITIVE", 3),
                neutral: env_parse("TREND_TOP_NEUTRAL", 3),
                negative: env_parse("TREND_TOP_NEGATIVE", 2),
            },
            storage: StorageConfig {
                bucket: env_or("STORAGE_BUCKET", "csv-uploads"),
                endpoint: env_opt("STORAGE_ENDPOINT"),
                public_url: env_opt("STORAGE_PUBLIC_URL"),
            },
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", 50 * 1024 * 1024),
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr + Copy + std::fmt::Debug>(key: &str, default: T) -> T {
    match env_opt(key) {
        Some(raw) => parse_or(key, &raw, default),
        None => default,
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Debug>(key: &str, raw: &str, default: T) -> T {
    raw.parse().unwrap_or_else(|_| {
        warn!(key, value = raw, ?default, "Unparsable config value, using default");
        default
    })
}

/// Splits a comma separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_skips_blanks() {
        let origins = parse_list("http://localhost:3000, ,https://app.example.com,");
        assert_eq!(
            origins,
            vec!["http://localhost:3000".to_string(), "https://app.example.com".to_string()]
        );
    }

    #[test]
    fn test_parse_or_falls_back() {
        assert_eq!(parse_or("LLM_TIMEOUT_SECS", "abc", 25u64), 25);
        assert_eq!(parse_or("LLM_TIMEOUT_SECS", "30", 25u64), 30);
    }
}
