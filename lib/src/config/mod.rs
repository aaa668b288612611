// lib/src/config/mod.rs
//! Service configuration, loaded from a YAML file with per-field
//! environment overrides (`CLINIC_LISTEN_ADDR`, `CLINIC_DB_URL`,
//! `CLINIC_STORAGE_ENGINE`).

use std::path::Path;

use log::{info, warn};
use models::errors::{ClinicError, ClinicResult};
use serde::{Serialize, Deserialize};
use serde_yaml2 as serde_yaml;

use crate::storage::StorageEngineKind;

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_session_ttl_minutes() -> i64 {
    120
}

fn default_remember_days() -> i64 {
    30
}

fn default_engine() -> StorageEngineKind {
    StorageEngineKind::Postgres
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_engine")]
    pub engine: StorageEngineKind,
    /// Postgres connection string; unused by the in-memory engine.
    #[serde(default)]
    pub connection_string: Option<String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        StorageSection {
            engine: default_engine(),
            connection_string: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default = "default_session_ttl_minutes")]
    pub ttl_minutes: i64,
    #[serde(default = "default_remember_days")]
    pub remember_days: i64,
}

impl Default for SessionSection {
    fn default() -> Self {
        SessionSection {
            ttl_minutes: default_session_ttl_minutes(),
            remember_days: default_remember_days(),
        }
    }
}

impl Default for ClinicConfig {
    fn default() -> Self {
        ClinicConfig {
            listen_addr: default_listen_addr(),
            storage: StorageSection::default(),
            session: SessionSection::default(),
        }
    }
}

impl ClinicConfig {
    /// Loads configuration from `path` when it exists, falling back to
    /// defaults otherwise, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> ClinicResult<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|e| ClinicError::Configuration(format!("failed to read {}: {}", p.display(), e)))?;
                let parsed: ClinicConfig = serde_yaml::from_str(&raw)
                    .map_err(|e| ClinicError::Configuration(format!("failed to parse {}: {}", p.display(), e)))?;
                info!("Loaded configuration from {}", p.display());
                parsed
            }
            Some(p) => {
                warn!("Config file {} not found, using defaults", p.display());
                ClinicConfig::default()
            }
            None => ClinicConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("CLINIC_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Ok(url) = std::env::var("CLINIC_DB_URL") {
            self.storage.connection_string = Some(url);
        }
        if let Ok(engine) = std::env::var("CLINIC_STORAGE_ENGINE") {
            match engine.as_str() {
                "postgres" => self.storage.engine = StorageEngineKind::Postgres,
                "memory" => self.storage.engine = StorageEngineKind::Memory,
                other => warn!("Unknown CLINIC_STORAGE_ENGINE '{}', keeping configured engine", other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ClinicConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.session.ttl_minutes, 120);
        assert_eq!(config.session.remember_days, 30);
        assert_eq!(config.storage.engine, StorageEngineKind::Postgres);
    }

    #[test]
    fn parses_partial_yaml_with_defaults() {
        let raw = "listen_addr: 0.0.0.0:9000\nstorage:\n  engine: memory\n";
        let config: ClinicConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.storage.engine, StorageEngineKind::Memory);
        assert_eq!(config.session.ttl_minutes, 120);
    }
}
