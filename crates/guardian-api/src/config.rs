//! Service configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file named by `GUARDIAN_CONFIG` (optional)
//! 3. `GUARDIAN__<SECTION>__<KEY>` environment variables
//! 4. `PORT` (Cloud Run style override for `server.port`)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use guardian_core::{PipelineConfig, PluginClientConfig, TargetConfig};
use serde::Deserialize;
use validator::{Validate, ValidationError};

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_token_ttl_secs() -> i64 {
    guardian_core::token::DEFAULT_TTL_SECONDS
}

fn default_request_limit() -> u32 {
    10
}

fn default_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on a whole `/send` exchange, plugins and target included.
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Caller identity verification.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AuthConfig {
    /// Secret shared with the upstream auth layer. Unset disables signature
    /// checks and trusts the user header as-is.
    #[serde(default)]
    pub shared_secret: Option<String>,
    #[serde(default = "default_token_ttl_secs")]
    #[validate(range(min = 1))]
    pub token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            shared_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

/// Per-user request quota.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_request_limit")]
    #[validate(range(min = 1))]
    pub request_limit: u32,
    #[serde(default = "default_interval_secs")]
    #[validate(range(min = 1))]
    pub interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            request_limit: default_request_limit(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// JSON seed for the in-memory catalog. Unset starts empty.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub json: bool,
    /// Used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: default_log_level(),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,
    #[serde(default)]
    #[validate(custom(function = "validate_pipeline"))]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    #[validate(custom(function = "validate_plugins"))]
    pub plugins: PluginClientConfig,
    #[serde(default)]
    #[validate(custom(function = "validate_target"))]
    pub target: TargetConfig,
    #[serde(default)]
    #[validate(nested)]
    pub auth: AuthConfig,
    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ValidationError> {
    if pipeline.worker_pool_size == 0 {
        return Err(ValidationError::new("worker_pool_size_zero"));
    }
    Ok(())
}

fn validate_plugins(plugins: &PluginClientConfig) -> Result<(), ValidationError> {
    if plugins.http_timeout_secs == 0
        || plugins.grpc_timeout_secs == 0
        || plugins.grpc_connect_timeout_secs == 0
    {
        return Err(ValidationError::new("plugin_timeout_zero"));
    }
    Ok(())
}

fn validate_target(target: &TargetConfig) -> Result<(), ValidationError> {
    if target.timeout_secs == 0 {
        return Err(ValidationError::new("target_timeout_zero"));
    }
    Ok(())
}

impl AppConfig {
    /// Load from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut builder = Config::builder();

        if let Ok(path) = std::env::var("GUARDIAN_CONFIG") {
            builder = builder.add_source(File::with_name(&path));
        }

        builder = builder.add_source(
            Environment::with_prefix("GUARDIAN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {port}"))?;
        }

        config.validate().context("configuration failed validation")?;
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults.
    pub fn from_toml(toml: &str) -> anyhow::Result<Self> {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        config.validate().context("configuration failed validation")?;
        Ok(config)
    }
}
