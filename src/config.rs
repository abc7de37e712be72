use anyhow::{ensure, Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,

    // Translation endpoint
    pub translate_api_url: String,
    pub pronounce_api_url: String,
    pub request_timeout_secs: u64,

    // Preferences applied to selections that carry no language hints
    pub default_source_language: String,
    pub default_target_language: String,

    // Server
    pub api_key: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            // Translation endpoint
            translate_api_url: std::env::var("TRANSLATE_API_URL").unwrap_or_else(|_| {
                "https://translate.googleapis.com/translate_a/single".to_string()
            }),
            pronounce_api_url: std::env::var("PRONOUNCE_API_URL").unwrap_or_else(|_| {
                "https://translate.googleapis.com/translate_tts".to_string()
            }),
            request_timeout_secs: match std::env::var("TRANSLATE_TIMEOUT_SECS") {
                Ok(v) => parse_timeout_secs(&v)?,
                Err(_) => 10,
            },

            // Preferences
            default_source_language: std::env::var("DEFAULT_SOURCE_LANGUAGE")
                .unwrap_or_else(|_| "Auto-detect".to_string()),
            default_target_language: std::env::var("DEFAULT_TARGET_LANGUAGE")
                .unwrap_or_else(|_| "English".to_string()),

            // Server
            api_key: std::env::var("API_KEY").ok().filter(|k| !k.is_empty()),
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: match std::env::var("PORT") {
                Ok(v) => v.parse().context("PORT must be a valid port number")?,
                Err(_) => 8080,
            },
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_timeout_secs(value: &str) -> Result<u64> {
    let secs: u64 = value
        .trim()
        .parse()
        .context("TRANSLATE_TIMEOUT_SECS must be a whole number of seconds")?;
    ensure!(secs > 0, "TRANSLATE_TIMEOUT_SECS must be greater than zero");
    Ok(secs)
}
