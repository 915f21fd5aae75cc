//! CampusSport Configuration System
//!
//! This crate provides TOML-based configuration with environment variable
//! override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub deprecation: DeprecationConfig,
    pub telemetry: TelemetryConfig,
    pub checkin: CheckinConfig,

    /// Enable development mode (in-memory store is seeded with demo data)
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            deprecation: DeprecationConfig::default(),
            telemetry: TelemetryConfig::default(),
            checkin: CheckinConfig::default(),
            dev_mode: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telemetry.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "telemetry.buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.http.port == self.http.metrics_port {
            return Err(ConfigError::ValidationError(
                "http.port and http.metrics_port must differ".to_string(),
            ));
        }
        // Sunset must look like a calendar date, it is emitted verbatim in headers
        let sunset = &self.deprecation.sunset_date;
        let looks_like_date = sunset.len() == 10
            && sunset.chars().enumerate().all(|(i, c)| match i {
                4 | 7 => c == '-',
                _ => c.is_ascii_digit(),
            });
        if !looks_like_date {
            return Err(ConfigError::ValidationError(format!(
                "deprecation.sunset_date must be YYYY-MM-DD, got '{}'",
                sunset
            )));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    /// Request-level timeout applied at the server edge, in seconds
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            metrics_port: 9090,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Deprecation policy for the legacy `/api/...` surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeprecationConfig {
    /// Planned removal date, emitted in the `Sunset` header
    pub sunset_date: String,
    /// Migration guide URL, emitted in `X-API-Migration-Guide`
    pub migration_guide_url: String,
}

impl Default for DeprecationConfig {
    fn default() -> Self {
        Self {
            sunset_date: "2025-12-31".to_string(),
            migration_guide_url: "https://docs.example.com/api-migration".to_string(),
        }
    }
}

/// Usage telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Capacity of the in-process record channel; records beyond it are dropped
    pub buffer_size: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { buffer_size: 4096 }
    }
}

/// Training check-in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinConfig {
    /// Secret for HMAC-SHA256 QR token verification
    pub qr_secret: String,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            qr_secret: "dev-qr-secret".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.deprecation.sunset_date, "2025-12-31");
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let mut config = AppConfig::default();
        config.telemetry.buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_sunset_rejected() {
        let mut config = AppConfig::default();
        config.deprecation.sunset_date = "soon".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_port_clash_rejected() {
        let mut config = AppConfig::default();
        config.http.metrics_port = config.http.port;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [http]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.telemetry.buffer_size, 4096);
    }
}
