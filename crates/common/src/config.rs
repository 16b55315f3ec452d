//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Session cookies expire after 5 days (432 000 000 ms).
pub const SESSION_MAX_AGE: Duration = Duration::from_millis(3_600_000 * 24 * 5);

/// Deployment environment the server runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Staging and production sit behind TLS and must enforce HTTPS
    pub fn enforces_https(&self) -> bool {
        matches!(self, Environment::Staging | Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(anyhow::anyhow!(
                "Unknown APP_ENV: {}. Supported: development, staging, production",
                other
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Log output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Runtime environment
    pub env: Environment,

    /// Secret used to sign session cookies
    #[serde(skip_serializing)]
    pub secret: String,

    /// Session cookie lifetime (fixed)
    pub session_max_age: Duration,

    /// Directory holding `<name>.html` view templates
    pub views_dir: Option<PathBuf>,

    /// Honour `X-Forwarded-Proto` from the fronting proxy
    pub trust_proxy: bool,

    /// BaaS REST API
    pub leancloud_app_id: String,
    #[serde(skip_serializing)]
    pub leancloud_app_key: String,
    pub leancloud_api_server: String,
    pub leancloud_timeout: Duration,

    /// Runtime configuration
    pub rust_log: String,
    pub log_format: LogFormat,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    #[mutants::skip] // Reads the process environment; covered via from_lookup
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} is required", key))
        };

        let env = lookup("APP_ENV")
            .map(|v| v.parse::<Environment>())
            .transpose()?
            .unwrap_or(Environment::Development);

        let trust_proxy = match lookup("TRUST_PROXY") {
            Some(v) => parse_bool(&v)
                .ok_or_else(|| anyhow::anyhow!("TRUST_PROXY must be true or false, got {}", v))?,
            None => true,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let timeout_secs: u64 = lookup("LEANCLOUD_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("LEANCLOUD_TIMEOUT_SECS is invalid: {}", e))?;

        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT is invalid: {}", e))?;

        let config = Self {
            env,
            secret: required("SESSION_SECRET")?,
            session_max_age: SESSION_MAX_AGE,
            views_dir: lookup("VIEWS_DIR").filter(|v| !v.is_empty()).map(PathBuf::from),
            trust_proxy,

            leancloud_app_id: required("LEANCLOUD_APP_ID")?,
            leancloud_app_key: required("LEANCLOUD_APP_KEY")?,
            leancloud_api_server: required("LEANCLOUD_API_SERVER")?
                .trim_end_matches('/')
                .to_string(),
            leancloud_timeout: Duration::from_secs(timeout_secs),

            rust_log: lookup("RUST_LOG")
                .unwrap_or_else(|| "leanweb=debug,tower_http=info".to_string()),
            log_format,
            port,
        };

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
