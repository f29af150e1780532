//! Host configuration loaded from an optional JSON file.

use std::path::Path;

use anyhow::{Context, Result};
use engine_ecs::WorldConfig;
use serde::Deserialize;

use crate::tick::TickConfig;

/// Parameters of the demo spawner.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Entities created per tick.
    pub per_tick: u32,
    /// Seconds each spawned entity lives.
    pub lifetime: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            per_tick: 8,
            lifetime: 2.0,
        }
    }
}

/// Everything the host reads from its config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub tick: TickConfig,
    pub spawn: SpawnConfig,
}

impl AppConfig {
    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON for
    /// this structure.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parses a JSON config document. Missing sections keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the JSON parse error.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_json(
            r#"{ "world": { "entity_capacity": 64 }, "tick": { "max_ticks": 10 } }"#,
        )
        .unwrap();
        assert_eq!(config.world.entity_capacity, 64);
        assert_eq!(config.world.query_capacity, 512);
        assert_eq!(config.tick.max_ticks, 10);
        assert!((config.tick.tick_rate - 60.0).abs() < f64::EPSILON);
        assert_eq!(config.spawn, SpawnConfig::default());
    }

    #[test]
    fn test_invalid_json_fails() {
        assert!(AppConfig::from_json("{ \"tick\": 3 }").is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = AppConfig::load(Path::new("/nonexistent/engine.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/engine.json"));
    }
}
