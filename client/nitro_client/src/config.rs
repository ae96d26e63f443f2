//! Client configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend REST base URL (e.g. https://api.nitro.example/api)
    pub api_url: String,
    /// Identity provider auth base URL (e.g. https://xyz.supabase.co/auth/v1)
    pub auth_url: String,
    /// Public key sent to the identity provider as `apikey`
    pub auth_key: String,
    /// SQLite URL of the durable client store
    pub store_url: String,
    /// Loopback port the OAuth redirect lands on
    pub oauth_port: u16,
    /// Per-request timeout in seconds; 0 leaves requests unbounded
    pub request_timeout_secs: u64,
    /// Timeout for aggregate screens that fan out to several endpoints
    pub aggregate_timeout_secs: u64,
    /// Signup cooldown used when the provider rate-limits without a hint
    pub signup_cooldown_secs: u64,
    /// Directory CSV exports are written to
    pub export_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            api_url: required("NITRO_API_URL")?,
            auth_url: required("NITRO_AUTH_URL")?,
            auth_key: required("NITRO_AUTH_KEY")?,
            store_url: env_var("NITRO_STORE_URL")
                .unwrap_or_else(|_| "sqlite:./nitro_client.db".to_string()),
            oauth_port: parsed("NITRO_OAUTH_PORT", "5173")?,
            request_timeout_secs: parsed("NITRO_REQUEST_TIMEOUT_SECS", "0")?,
            aggregate_timeout_secs: parsed("NITRO_AGGREGATE_TIMEOUT_SECS", "15")?,
            signup_cooldown_secs: parsed("NITRO_SIGNUP_COOLDOWN_SECS", "60")?,
            export_dir: PathBuf::from(env_var("NITRO_EXPORT_DIR").unwrap_or_else(|_| ".".to_string())),
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ClientError::Config(format!("Missing env var: {key}")))
}

fn required(key: &str) -> Result<String> {
    let value = env_var(key)
        .map_err(|_| ClientError::Config(format!("{key} environment variable is required")))?;
    Ok(value.trim_end_matches('/').to_string())
}

fn parsed<T: FromStr>(key: &str, default: &str) -> Result<T> {
    env_var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ClientError::Config(format!("Invalid {key}")))
}
