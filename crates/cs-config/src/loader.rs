//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "campussport.toml",
    "./config/config.toml",
    "/etc/campussport/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        // Start with defaults
        let mut config = AppConfig::default();

        // Try to load from file
        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        // Check explicit path first
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        // Check CAMPUSSPORT_CONFIG env var
        if let Ok(path) = env::var("CAMPUSSPORT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // Search standard paths
        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // HTTP
        if let Ok(val) = env::var("CAMPUSSPORT_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http.port = port;
            }
        }
        if let Ok(val) = env::var("CAMPUSSPORT_METRICS_PORT") {
            if let Ok(port) = val.parse() {
                config.http.metrics_port = port;
            }
        }
        if let Ok(val) = env::var("CAMPUSSPORT_HTTP_HOST") {
            config.http.host = val;
        }
        if let Ok(val) = env::var("CAMPUSSPORT_CORS_ORIGINS") {
            config.http.cors_origins = val.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(val) = env::var("CAMPUSSPORT_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.http.request_timeout_secs = secs;
            }
        }

        // Deprecation policy
        if let Ok(val) = env::var("CAMPUSSPORT_SUNSET_DATE") {
            config.deprecation.sunset_date = val;
        }
        if let Ok(val) = env::var("CAMPUSSPORT_MIGRATION_GUIDE_URL") {
            config.deprecation.migration_guide_url = val;
        }

        // Telemetry
        if let Ok(val) = env::var("CAMPUSSPORT_TELEMETRY_BUFFER_SIZE") {
            if let Ok(size) = val.parse() {
                config.telemetry.buffer_size = size;
            }
        }

        // Check-in
        if let Ok(val) = env::var("CAMPUSSPORT_QR_SECRET") {
            config.checkin.qr_secret = val;
        }

        // General
        if let Ok(val) = env::var("CAMPUSSPORT_DEV_MODE") {
            config.dev_mode = val.parse().unwrap_or(false);
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            dev_mode = true

            [deprecation]
            sunset_date = "2026-06-30"
            "#
        )
        .unwrap();

        let config = ConfigLoader::with_path(file.path()).load().unwrap();
        assert!(config.dev_mode);
        assert_eq!(config.deprecation.sunset_date, "2026-06-30");
        // Untouched sections keep defaults
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ConfigLoader::with_path("/nonexistent/config.toml")
            .load()
            .unwrap();
        assert_eq!(config.http.port, 8080);
        assert!(!config.dev_mode);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [telemetry]
            buffer_size = 0
            "#
        )
        .unwrap();

        assert!(ConfigLoader::with_path(file.path()).load().is_err());
    }
}
