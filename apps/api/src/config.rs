use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::history::EditorSettings;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// TeX engine used for PDF export.
    pub latex_program: String,
    pub latex_timeout: Duration,
    pub history_debounce: Duration,
    pub autosave_debounce: Duration,
    pub session_idle_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            latex_program: std::env::var("LATEX_PROGRAM")
                .unwrap_or_else(|_| "pdflatex".to_string()),
            latex_timeout: Duration::from_secs(parse_env("LATEX_TIMEOUT_SECS", 60)?),
            history_debounce: Duration::from_millis(parse_env("HISTORY_DEBOUNCE_MS", 800)?),
            autosave_debounce: Duration::from_millis(parse_env("AUTOSAVE_DEBOUNCE_MS", 2000)?),
            session_idle_timeout: Duration::from_secs(parse_env(
                "SESSION_IDLE_TIMEOUT_SECS",
                DEFAULT_SESSION_IDLE_SECS,
            )?),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    pub fn editor_settings(&self) -> EditorSettings {
        EditorSettings {
            history_debounce: self.history_debounce,
            autosave_debounce: self.autosave_debounce,
            idle_timeout: self.session_idle_timeout,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'"))
}
