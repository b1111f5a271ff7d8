use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Where users and sessions are persisted
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Ephemeral in-memory store
    Memory,
    /// Embedded file-backed SQLite store
    Sqlite { path: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: "sessions.db".to_string(),
        }
    }
}

/// Construction configuration for the session manager
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    /// Storage backend to use
    #[serde(default)]
    pub storage: StorageConfig,
    /// How many days a newly created session remains valid
    #[serde(default = "default_session_duration_days")]
    pub session_duration_days: i64,
}

fn default_session_duration_days() -> i64 {
    30
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            session_duration_days: default_session_duration_days(),
        }
    }
}

impl ManagerConfig {
    /// Validate the configuration. A zero-day duration is legal (sessions
    /// are born expired); a negative one is a configuration error.
    pub fn validate(&self) -> Result<(), String> {
        if self.session_duration_days < 0 {
            return Err(format!(
                "session_duration_days must be >= 0, got {}",
                self.session_duration_days
            ));
        }

        if let StorageConfig::Sqlite { path } = &self.storage {
            if path.is_empty() {
                return Err("sqlite storage path must not be empty".to_string());
            }
        }

        Ok(())
    }
}

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ManagerConfig, String> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    let config: ManagerConfig = serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse YAML config: {}", e))?;

    config.validate()?;

    info!(
        "Configuration loaded: sessions valid for {} day(s)",
        config.session_duration_days
    );

    Ok(config)
}

/// Load configuration with fallback options
pub fn load_config_with_fallback() -> Result<ManagerConfig, String> {
    // Try loading from environment variable first
    if let Ok(config_path) = std::env::var("AUTHKIT_CONFIG") {
        match load_config(&config_path) {
            Ok(config) => return Ok(config),
            Err(e) => warn!(
                "Failed to load config from AUTHKIT_CONFIG ({}): {}",
                config_path, e
            ),
        }
    }

    // Try common config file locations
    let paths = vec!["authkit.yaml", "authkit.yml"];

    for path in paths {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    // No config file is fine; fall back to the defaults
    info!("No configuration file found, using defaults");
    Ok(ManagerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.session_duration_days, 30);
        assert!(matches!(config.storage, StorageConfig::Sqlite { .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
storage:
  type: sqlite
  path: /tmp/sessions.db
session_duration_days: 7
"#;

        let config: ManagerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.session_duration_days, 7);
        match config.storage {
            StorageConfig::Sqlite { ref path } => assert_eq!(path, "/tmp/sessions.db"),
            _ => panic!("expected sqlite storage"),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_memory_storage() {
        let yaml = r#"
storage:
  type: memory
"#;

        let config: ManagerConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.session_duration_days, 30);
    }

    #[test]
    fn test_validation_rejects_negative_duration() {
        let config = ManagerConfig {
            session_duration_days: -1,
            ..Default::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("session_duration_days"));
    }

    #[test]
    fn test_validation_allows_zero_duration() {
        let config = ManagerConfig {
            session_duration_days: 0,
            ..Default::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_sqlite_path() {
        let config = ManagerConfig {
            storage: StorageConfig::Sqlite {
                path: String::new(),
            },
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }
}
