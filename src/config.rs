use anyhow::Context;
use mcrs_worldgen::preset;
use mcrs_worldgen::proto::NoiseGeneratorSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub seed: u64,
    /// Chunks generated on each side of the origin chunk.
    pub radius: i32,
    /// Generator settings JSON; the built-in preset when absent.
    pub settings_path: Option<PathBuf>,
    pub threads: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            radius: 2,
            settings_path: None,
            threads: 4,
        }
    }
}

impl TerrainConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn settings(&self) -> anyhow::Result<NoiseGeneratorSettings> {
        let Some(path) = &self.settings_path else {
            return Ok(preset::overworld_like());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading generator settings {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("parsing generator settings {}", path.display()))
    }

    /// Number of chunks in the generated square.
    pub fn chunk_count(&self) -> usize {
        let side = (self.radius.max(0) * 2 + 1) as usize;
        side * side
    }
}

#[cfg(test)]
mod test {
    use crate::config::TerrainConfig;
    use std::path::PathBuf;

    #[test]
    fn missing_fields_take_defaults() {
        let config: TerrainConfig = serde_json::from_str(r#"{"seed": 5}"#).unwrap();
        assert_eq!(
            config,
            TerrainConfig {
                seed: 5,
                ..TerrainConfig::default()
            }
        );
        assert_eq!(config.chunk_count(), 25);
    }

    #[test]
    fn no_path_means_defaults_and_preset() {
        let config = TerrainConfig::load(None).unwrap();
        assert_eq!(config, TerrainConfig::default());
        assert_eq!(config.settings().unwrap().sea_level, 63);
    }

    #[test]
    fn unreadable_settings_are_reported() {
        let config = TerrainConfig {
            settings_path: Some(PathBuf::from("/nonexistent/settings.json")),
            ..TerrainConfig::default()
        };
        let err = config.settings().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/settings.json"));
    }
}
