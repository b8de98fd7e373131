//! Configuration management for the SwipeFeed engine
//!
//! Strongly-typed configuration with validation, environment variable parsing,
//! and sensible defaults.
//!
//! # Example
//! ```no_run
//! use swipefeed::Config;
//! let config = Config::from_env().expect("failed to load config");
//! println!("Listening on {}:{}", config.api.host, config.api.port);
//! ```

use crate::error::{Error, Result};
use crate::feed::DuplicatePolicy;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,
    /// API server configuration
    pub api: ApiConfig,
    /// Feed engine and swipe recorder configuration
    pub feed: FeedConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Minimum connections to keep open
    pub min_connections: u32,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Idle timeout for connections
    pub idle_timeout: Duration,
    /// Maximum lifetime for connections
    pub max_lifetime: Duration,
    /// Prepared statement cache size per connection
    pub statement_cache_size: usize,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Maximum request body size
    pub max_body_size: usize,
    /// Enable CORS
    pub cors_enabled: bool,
    /// Allowed origins for CORS (`*` for any)
    pub cors_origins: Vec<String>,
}

/// Where posts, swipes and users live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "in-memory" | "mem" => Ok(Self::Memory),
            other => Err(Error::InvalidConfig {
                key: "STORAGE_BACKEND",
                message: format!("unknown storage backend '{}'", other).into(),
            }),
        }
    }
}

/// Feed engine configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Storage backend for all stores
    pub storage_backend: StorageBackend,
    /// Repeat-swipe handling
    pub duplicate_policy: DuplicatePolicy,
    /// Feed computations slower than this are logged at warn level
    pub slow_feed_threshold: Duration,
    /// Port for the Prometheus exporter (`metrics` feature only)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // A directory of files (ENV_DIR) takes precedence, for platforms that
        // mount secrets as files: file name is the variable, contents the value.
        if let Ok(folder) = std::env::var("ENV_DIR") {
            load_env_dir(&folder);
        } else {
            // Try to load .env file (ignore if not found)
            dotenvy::dotenv().ok();
        }

        let config = Self {
            database: DatabaseConfig::from_env()?,
            api: ApiConfig::from_env()?,
            feed: FeedConfig::from_env()?,
        };

        config.validate()?;
        config.log_summary();

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.feed.storage_backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(Error::InvalidConfig {
                key: "DATABASE_URL",
                message: "database URL cannot be empty with the postgres backend".into(),
            });
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(Error::InvalidConfig {
                key: "DB_MAX_CONNECTIONS",
                message: "max_connections must be >= min_connections".into(),
            });
        }

        if self.api.max_body_size == 0 {
            return Err(Error::InvalidConfig {
                key: "API_MAX_BODY_SIZE",
                message: "max body size must be positive".into(),
            });
        }

        Ok(())
    }

    /// Log configuration summary (without sensitive data)
    fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  Storage: {:?}", self.feed.storage_backend);
        if self.feed.storage_backend == StorageBackend::Postgres {
            info!("  Database:");
            info!("    URL: {}", mask_url(&self.database.url));
            info!(
                "    Pool Size: {}-{}",
                self.database.min_connections, self.database.max_connections
            );
        }
        info!("  API:");
        info!("    Listening on: {}:{}", self.api.host, self.api.port);
        info!("    CORS: {}", self.api.cors_enabled);
        info!("  Feed:");
        info!("    Duplicate swipes: {:?}", self.feed.duplicate_policy);
        info!("    Slow feed threshold: {:?}", self.feed.slow_feed_threshold);
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url = get_env("DATABASE_URL").unwrap_or_else(|_| {
            let user = std::env::var("USER").unwrap_or_else(|_| "postgres".to_string());
            format!("postgres://{}@localhost/swipefeed_dev", user)
        });

        Ok(Self {
            url,
            max_connections: get_env_or("DB_MAX_CONNECTIONS", "20").parse().unwrap_or(20),
            min_connections: get_env_or("DB_MIN_CONNECTIONS", "2").parse().unwrap_or(2),
            connect_timeout: Duration::from_secs(
                get_env_or("DB_CONNECT_TIMEOUT_SECS", "30")
                    .parse()
                    .unwrap_or(30),
            ),
            idle_timeout: Duration::from_secs(
                get_env_or("DB_IDLE_TIMEOUT_SECS", "600")
                    .parse()
                    .unwrap_or(600),
            ),
            max_lifetime: Duration::from_secs(
                get_env_or("DB_MAX_LIFETIME_SECS", "3600")
                    .parse()
                    .unwrap_or(3600),
            ),
            statement_cache_size: get_env_or("DB_STATEMENT_CACHE_SIZE", "100")
                .parse()
                .unwrap_or(100),
        })
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            port: get_env_parsed_or("API_PORT", 9091)?,
            host: get_env_or("API_HOST", "0.0.0.0"),
            request_timeout: Duration::from_secs(
                get_env_or("API_REQUEST_TIMEOUT_SECS", "30")
                    .parse()
                    .unwrap_or(30),
            ),
            max_body_size: get_env_or("API_MAX_BODY_SIZE", "1048576")
                .parse()
                .unwrap_or(1024 * 1024),
            cors_enabled: get_env_or("API_CORS_ENABLED", "true")
                .parse()
                .unwrap_or(true),
            cors_origins: get_env_or("API_CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

impl FeedConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            storage_backend: get_env_or("STORAGE_BACKEND", "postgres").parse()?,
            duplicate_policy: get_env_or("SWIPE_DUPLICATE_POLICY", "accumulate")
                .parse()
                .map_err(|_| Error::InvalidConfig {
                    key: "SWIPE_DUPLICATE_POLICY",
                    message: "expected 'accumulate' or 'one_per_direction'".into(),
                })?,
            slow_feed_threshold: Duration::from_millis(
                get_env_or("FEED_SLOW_THRESHOLD_MS", "250")
                    .parse()
                    .unwrap_or(250),
            ),
            metrics_port: get_env_or("METRICS_PORT", "9464").parse().unwrap_or(9464),
        })
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Export every file in `folder` as an environment variable, unless the
/// variable is already set.
fn load_env_dir(folder: &str) {
    let path = std::path::Path::new(folder);
    if !path.is_dir() {
        warn!("ENV_DIR {} is not a directory, ignoring", folder);
        return;
    }

    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Failed to read ENV_DIR {}: {}", folder, err);
            return;
        }
    };

    for entry in entries.flatten() {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if let Ok(contents) = std::fs::read_to_string(&file_path) {
            if std::env::var(&name).is_err() {
                std::env::set_var(&name, contents.trim());
            }
        }
    }
    info!("Loaded configuration from ENV_DIR={}", folder);
}

/// Get required environment variable
fn get_env(key: &'static str) -> Result<String> {
    std::env::var(key).map_err(|_| Error::MissingEnvVar { var: key })
}

/// Get environment variable with default
fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, using `default` when unset but failing on garbage
fn get_env_parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| Error::InvalidConfig {
            key,
            message: format!("Invalid value '{}': {}", value, e).into(),
        }),
        Err(_) => Ok(default),
    }
}

/// Mask sensitive parts of URL
fn mask_url(url: &str) -> String {
    let Some(at_pos) = url.find('@') else {
        return url.to_string();
    };
    let authority = url.find("://").map(|i| i + 3).unwrap_or(0);
    if authority > at_pos {
        return url.to_string();
    }
    match url[authority..at_pos].find(':') {
        Some(colon) => format!("{}****{}", &url[..authority + colon + 1], &url[at_pos..]),
        None => url.to_string(),
    }
}
