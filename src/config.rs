use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated, or `*`
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// How long a held lock survives without a heartbeat
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,

    /// Period of the liveness sweep
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Heartbeat cadence clients are expected to keep
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Connections silent for this long are closed
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Storage backend for slide images
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,

    #[serde(default = "default_blob_bucket")]
    pub blob_bucket: String,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        let config = match envy::from_env::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                return Err(ConfigError::EnvError(e));
            }
        };
        config.validate()?;
        info!("✅ Configuration loaded successfully");
        Ok(config)
    }

    /// Reject timings under which live holders would lose their locks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::Invalid("SWEEP_INTERVAL_MS must be greater than zero".to_string()));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid("HEARTBEAT_INTERVAL_MS must be greater than zero".to_string()));
        }
        if self.idle_timeout_ms < self.lock_ttl_ms {
            return Err(ConfigError::Invalid(format!(
                "IDLE_TIMEOUT_MS ({}) must not be shorter than LOCK_TTL_MS ({})",
                self.idle_timeout_ms, self.lock_ttl_ms
            )));
        }
        if self.lock_ttl_ms < self.heartbeat_interval_ms.saturating_mul(2) {
            return Err(ConfigError::Invalid(format!(
                "LOCK_TTL_MS ({}) must be at least twice HEARTBEAT_INTERVAL_MS ({})",
                self.lock_ttl_ms, self.heartbeat_interval_ms
            )));
        }
        Ok(())
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Default tracing filter when `RUST_LOG` is unset: `log_level` for this
    /// crate, info for everything else.
    pub fn log_filter(&self) -> String {
        format!(
            "wt_locks={level},tower_http={level},axum::rejection=trace,info",
            level = self.log_level.trim()
        )
    }

    /// Explicit CORS origins, or `None` when any origin is allowed.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        if self.allowed_origins.trim() == "*" {
            return None;
        }
        Some(
            self.allowed_origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            allowed_origins: default_allowed_origins(),
            log_level: default_log_level(),
            service_name: default_service_name(),
            lock_ttl_ms: default_lock_ttl_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            supabase_url: None,
            supabase_key: None,
            blob_bucket: default_blob_bucket(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "wt-locks".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_allowed_origins() -> String {
    "*".to_string()
}

fn default_lock_ttl_ms() -> u64 {
    20_000
}

fn default_sweep_interval_ms() -> u64 {
    2_000
}

fn default_heartbeat_interval_ms() -> u64 {
    5_000
}

fn default_idle_timeout_ms() -> u64 {
    60_000
}

fn default_blob_bucket() -> String {
    "user_images".to_string()
}
