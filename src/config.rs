use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

fn default_api_host() -> String {
    "0.0.0.0".into()
}

fn default_api_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

// Dashboard dev server and desktop shell.
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://localhost:1420".into(),
        "http://127.0.0.1:3000".into(),
        "http://127.0.0.1:1420".into(),
    ]
}

/// How many synthetic results a device data request returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    #[serde(default = "default_min_count")]
    pub min_count: usize,
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            min_count: default_min_count(),
            max_count: default_max_count(),
        }
    }
}

fn default_min_count() -> usize {
    5
}

fn default_max_count() -> usize {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

impl LoggingConfig {
    /// `EnvFilter` directives for the configured level.
    ///
    /// A bare level such as `debug` targets this crate and `tower_http`, with
    /// everything else at `warn`. Anything containing a target (`=`) or a
    /// list (`,`) is passed through untouched.
    pub fn filter_directives(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            return level.to_string();
        }

        format!(
            "warn,{}={level},tower_http={level}",
            env!("CARGO_CRATE_NAME"),
            level = level
        )
    }
}

impl Config {
    /// Load YAML from disk, substitute $(VAR) with env vars, then parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&raw)?;

        if let Some(port) = env::var("SERVER_PORT").ok().and_then(|s| s.parse().ok()) {
            config.api.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let expanded = substitute_env_vars(raw)?;
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    pub fn api_bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    fn validate(&self) -> Result<()> {
        if self.api.port == 0 {
            return Err(AppError::Config("Server port cannot be 0".to_string()));
        }

        if self.results.min_count < 1 {
            return Err(AppError::Config(
                "results.min_count must be at least 1".to_string(),
            ));
        }

        if self.results.min_count > self.results.max_count {
            return Err(AppError::Config(format!(
                "results.min_count ({}) exceeds results.max_count ({})",
                self.results.min_count, self.results.max_count
            )));
        }

        if self.logging.level.trim().is_empty() {
            return Err(AppError::Config("logging.level cannot be empty".to_string()));
        }

        for origin in &self.cors.allowed_origins {
            HeaderValue::from_str(origin).map_err(|_| {
                AppError::Config(format!("Invalid CORS origin: {}", origin))
            })?;
        }

        Ok(())
    }
}

/// Substitute environment variables in format $(VAR_NAME)
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\(([A-Z_][A-Z0-9_]*)\)")
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let value = env::var(var_name).map_err(|_| {
            AppError::Config(format!("Environment variable {} not set", var_name))
        })?;
        result = result.replace(&cap[0], &value);
    }

    Ok(result)
}
