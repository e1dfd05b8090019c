use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_RECOMPUTE_CHUNK_SIZE: u64 = 500;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1, max = 100))]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable output
    #[serde(default)]
    pub log_json: bool,

    /// Deployment environment name (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Run pending migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Movements fetched per page while replaying the log. Bounds memory for
    /// full-history recomputation runs.
    #[serde(default = "default_recompute_chunk_size")]
    #[validate(range(min = 1, max = 100_000))]
    pub recompute_chunk_size: u64,
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_db_min_connections() -> u32 {
    DEFAULT_DB_MIN_CONNECTIONS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_recompute_chunk_size() -> u64 {
    DEFAULT_RECOMPUTE_CHUNK_SIZE
}

impl AppConfig {
    /// Minimal constructor used by tests and embedders that do not load
    /// configuration files.
    pub fn new(database_url: String) -> Self {
        Self {
            database_url,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            log_level: default_log_level(),
            log_json: false,
            environment: "test".to_string(),
            auto_migrate: false,
            recompute_chunk_size: default_recompute_chunk_size(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Loads configuration from `config/default.toml`, an optional
/// environment-specific file, and `APP__`-prefixed environment variables
/// (e.g. `APP__DATABASE_URL`), then validates it.
pub fn load_config() -> Result<AppConfig, ConfigLoadError> {
    let run_env = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder().add_source(
        File::with_name(&format!("{}/default", CONFIG_DIR)).required(false),
    );

    let env_file = format!("{}/{}", CONFIG_DIR, run_env);
    if Path::new(&format!("{}.toml", env_file)).exists() {
        builder = builder.add_source(File::with_name(&env_file));
    }

    let cfg = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Installs the global tracing subscriber. `RUST_LOG` overrides the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("tavola_stock={},stock_audit={}", level, level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::try_new(filter_directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
