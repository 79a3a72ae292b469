//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `sensorhub.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     environment overrides so deployments can inject the MongoDB URI
//!     without editing the file.
//!
//! structure:
//!     - ServerConfig: bind address and port for the HTTP listener.
//!     - DatabaseConfig: MongoDB URI, database and collection names.
//!     - LoggingConfig: tracing filter level.
//!
//! ==============================================================================

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct HostConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: HostConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("sensorhub.toml"),
            std::path::PathBuf::from("sensorhub.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Apply environment overrides (deployment wins over file wins over default)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(uri) = std::env::var("MONGODB_URI") {
            if !uri.is_empty() {
                self.database.uri = uri;
            }
        }

        if let Ok(port) = std::env::var("SENSORHUB_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!("Invalid SENSORHUB_PORT value '{port}': {e}"),
            }
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│         SENSORHUB CONFIGURATION          │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Bind: {}:{}", self.server.bind, self.server.port);
        println!("│ Database: {}/{}", self.database.database, self.database.collection);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "sensor_data".to_string(),
            collection: "readings".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
