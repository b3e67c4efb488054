//! Configuration management

use clap::Parser;
use config::{Config as ConfigBuilder, ConfigError as BuilderError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServer(String),

    #[error("Invalid plugin configuration: {0}")]
    InvalidPlugin(String),

    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid stats configuration: {0}")]
    InvalidStats(String),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),

    #[error("Invalid security configuration: {0}")]
    InvalidSecurity(String),

    #[error("Invalid http client configuration: {0}")]
    InvalidHttp(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<BuilderError> for ConfigError {
    fn from(err: BuilderError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub plugins: PluginConfig,
    pub rate_limit: RateLimitConfig,
    pub stats: StatsConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub http: HttpClientConfig,
}

impl Config {
    /// Load configuration with precedence: CLI args > Environment variables > Config file > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        Self::load_with_args(cli_args)
    }

    fn load_with_args(cli_args: CliArgs) -> Result<Self, ConfigError> {
        let mut builder = Self::default_builder()?;

        // Load from config file if specified (medium priority)
        if let Some(config_path) = &cli_args.config {
            if !config_path.exists() {
                return Err(ConfigError::FileNotFound(
                    config_path.display().to_string(),
                ));
            }
            builder = builder
                .add_source(File::from(config_path.as_path()).format(FileFormat::Toml));
        }

        // Environment variables are prefixed with DITZZY_ and use __ for nesting,
        // e.g. DITZZY_SERVER__PORT=8080
        builder = builder.add_source(
            Environment::with_prefix("DITZZY")
                .separator("__")
                .try_parsing(true),
        );

        // CLI arguments have the highest priority
        if let Some(host) = &cli_args.host {
            builder = builder.set_override("server.host", host.clone())?;
        }
        if let Some(port) = cli_args.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(plugin_dir) = &cli_args.plugin_dir {
            builder =
                builder.set_override("plugins.plugin_dir", plugin_dir.display().to_string())?;
        }
        if let Some(log_level) = &cli_args.log_level {
            builder = builder.set_override("logging.level", log_level.clone())?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let config: Config = Self::default_builder()?
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from defaults only
    pub fn default_config() -> Result<Self, ConfigError> {
        let config: Config = Self::default_builder()?.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn default_builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError>
    {
        let builder = ConfigBuilder::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 7860)?
            .set_default("plugins.plugin_dir", "./plugins")?
            .set_default("plugins.enable_hot_reload", false)?
            .set_default("plugins.reload_debounce_ms", 200)?
            .set_default("rate_limit.max_requests", 25)?
            .set_default("rate_limit.window_seconds", 60)?
            .set_default("rate_limit.sweep_interval_seconds", 300)?
            .set_default("stats.persist_path", "./stats-data.json")?
            .set_default("stats.persistence_enabled", true)?
            .set_default("stats.save_debounce_seconds", 5)?
            .set_default("stats.max_fails_per_ip", 1)?
            .set_default("stats.fail_window_hours", 12)?
            .set_default("stats.fail_sweep_interval_seconds", 300)?
            .set_default("stats.visitor_retention_days", 90)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "text")?
            .set_default("logging.output", "stdout")?
            .set_default("security.allowed_origins", vec!["*"])?
            .set_default("http.request_timeout_seconds", 10)?
            .set_default("http.max_response_bytes", 5_242_880)?; // 5 MB
        Ok(builder)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.plugins.validate()?;
        self.rate_limit.validate()?;
        self.stats.validate()?;
        self.logging.validate()?;
        self.security.validate()?;
        self.http.validate()?;
        Ok(())
    }
}

/// Command-line arguments for configuration override
#[derive(Debug, Parser, Default)]
#[command(name = "ditzzy-api")]
#[command(about = "DitzzyAPI Backend Server", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server host address
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Plugin manifest directory path
    #[arg(long, value_name = "DIR")]
    pub plugin_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidServer("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidServer(
                "port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
    pub plugin_dir: PathBuf,
    pub enable_hot_reload: bool,
    pub reload_debounce_ms: u64,
}

impl PluginConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plugin_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidPlugin(
                "plugin_dir cannot be empty".to_string(),
            ));
        }

        if self.reload_debounce_ms == 0 {
            return Err(ConfigError::InvalidPlugin(
                "reload_debounce_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "max_requests must be greater than 0".to_string(),
            ));
        }

        if self.window_seconds == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "window_seconds must be greater than 0".to_string(),
            ));
        }

        if self.sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "sweep_interval_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    pub persist_path: PathBuf,
    pub persistence_enabled: bool,
    pub save_debounce_seconds: u64,
    pub max_fails_per_ip: u32,
    pub fail_window_hours: u64,
    pub fail_sweep_interval_seconds: u64,
    pub visitor_retention_days: u32,
}

impl StatsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.persistence_enabled && self.persist_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidStats(
                "persist_path cannot be empty when persistence is enabled".to_string(),
            ));
        }

        if self.fail_window_hours == 0 {
            return Err(ConfigError::InvalidStats(
                "fail_window_hours must be greater than 0".to_string(),
            ));
        }

        if self.visitor_retention_days == 0 {
            return Err(ConfigError::InvalidStats(
                "visitor_retention_days must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "level must be one of: {:?}",
                valid_levels
            )));
        }

        let valid_formats = ["json", "text"];
        if !valid_formats.contains(&self.format.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "format must be one of: {:?}",
                valid_formats
            )));
        }

        let valid_outputs = ["stdout", "file"];
        if !valid_outputs.contains(&self.output.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "output must be one of: {:?}",
                valid_outputs
            )));
        }

        if self.output == "file" && self.log_file.is_none() {
            return Err(ConfigError::InvalidLogging(
                "log_file must be specified when output is 'file'".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_origins.is_empty() {
            return Err(ConfigError::InvalidSecurity(
                "allowed_origins cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    pub request_timeout_seconds: u64,
    pub max_response_bytes: usize,
}

impl HttpClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidHttp(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.max_response_bytes == 0 {
            return Err(ConfigError::InvalidHttp(
                "max_response_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
