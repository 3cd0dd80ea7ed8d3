//! Runtime configuration.
//!
//! Loaded from TOML; every field has a default, so an empty file (or no file
//! at all) yields [`SimConfig::default`].

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SimError};
use crate::registry::{DEFAULT_BUCKET_SIZE, DEFAULT_SEARCH_RADIUS};
use crate::types::Position;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub registry: RegistryConfig,
    pub run: RunConfig,
}

/// Spatial index tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Edge length of a spatial bucket, in cells.
    pub bucket_size: i32,
    /// Rings searched before falling back to a linear scan.
    pub search_radius: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            search_radius: DEFAULT_SEARCH_RADIUS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Cell scanners return to once their path is exhausted.
    pub origin: Position,
}

impl SimConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry.bucket_size <= 0 {
            return Err(SimError::Config(format!(
                "registry.bucket_size must be positive, got {}",
                self.registry.bucket_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = SimConfig::from_toml("").expect("empty config parses");
        assert_eq!(config.registry.bucket_size, DEFAULT_BUCKET_SIZE);
        assert_eq!(config.registry.search_radius, DEFAULT_SEARCH_RADIUS);
        assert_eq!(config.run.origin, Position::new(0, 0));
    }

    #[test]
    fn partial_sections_override_only_named_fields() {
        let config = SimConfig::from_toml(
            r#"
            [registry]
            search_radius = 6

            [run]
            origin = [2, 3]
            "#,
        )
        .expect("config parses");
        assert_eq!(config.registry.bucket_size, DEFAULT_BUCKET_SIZE);
        assert_eq!(config.registry.search_radius, 6);
        assert_eq!(config.run.origin, Position::new(2, 3));
    }

    #[test]
    fn rejects_non_positive_bucket_size() {
        let err = SimConfig::from_toml("[registry]\nbucket_size = 0\n");
        assert!(matches!(err, Err(SimError::Config(_))));
    }

    #[test]
    fn malformed_toml_is_a_toml_error() {
        assert!(matches!(
            SimConfig::from_toml("[registry\n"),
            Err(SimError::Toml(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[registry]\nbucket_size = 4").expect("write config");
        let config = SimConfig::load(file.path()).expect("config loads");
        assert_eq!(config.registry.bucket_size, 4);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            SimConfig::load("/nonexistent/grid_sweep.toml"),
            Err(SimError::Io(_))
        ));
    }
}
