//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level geosphere configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Patch resolution and refinement settings.
    pub geosphere: GeoSphereConfig,
    /// Background worker settings.
    pub jobs: JobsConfig,
    /// The body to generate.
    pub body: BodyConfig,
    /// Scripted camera flight for the headless demo.
    pub flight: FlightConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Patch resolution and refinement configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeoSphereConfig {
    /// Detail level 0-4, selecting 7, 15, 25, 35 or 55 vertices per patch edge.
    pub detail: u8,
    /// Triangle edge length in meters at which refinement stops.
    pub target_triangle_length_m: f64,
    /// Depth ceiling applied to every body. Never exceeds 28.
    pub global_max_depth: u8,
    /// Camera distance, in body radii, at which roots want to subdivide.
    pub subdivide_at_camdist: f64,
    /// Maximum outstanding split jobs per body.
    pub max_split_operations: usize,
}

impl Default for GeoSphereConfig {
    fn default() -> Self {
        Self {
            detail: 1,
            target_triangle_length_m: 100.0,
            global_max_depth: 20,
            subdivide_at_camdist: 5.0,
            max_split_operations: 128,
        }
    }
}

/// Background worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobsConfig {
    /// Worker thread count. 0 picks `num_cpus - 2`, at least one.
    pub worker_threads: usize,
    /// Jobs that may wait for a worker before submission is refused.
    pub max_queued: usize,
    /// Finished jobs that may wait to be drained.
    pub result_capacity: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_queued: 256,
            result_capacity: 256,
        }
    }
}

/// Body configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BodyConfig {
    pub name: String,
    /// Radius in meters.
    pub radius_m: f64,
    /// Terrain noise seed.
    pub seed: u64,
    /// Highest terrain point above the radius, in meters.
    pub max_feature_height_m: f64,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            name: "Terra".to_string(),
            radius_m: 6_371_000.0,
            seed: 42,
            max_feature_height_m: 8_000.0,
        }
    }
}

/// Scripted flight configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlightConfig {
    /// Camera altitude above the radius at the first tick, in meters.
    pub start_altitude_m: f64,
    /// Camera altitude at the last tick, in meters.
    pub end_altitude_m: f64,
    /// Number of simulation ticks in the flight.
    pub ticks: u32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            start_altitude_m: 20_000_000.0,
            end_altitude_m: 500.0,
            ticks: 600,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for JSON log files. Empty disables file logging.
    pub log_dir: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if an existing file cannot be read or parsed,
    /// or if the default file cannot be written.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if serialization or the write fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("detail: 1"), "got {ron_str}");
        assert!(ron_str.contains("max_split_operations: 128"), "got {ron_str}");
    }

    #[test]
    fn test_defaults_match_engine_settings() {
        let config = Config::default();
        assert_eq!(config.geosphere.global_max_depth, 20);
        assert_eq!(config.geosphere.target_triangle_length_m, 100.0);
        assert_eq!(config.jobs.worker_threads, 0, "0 selects the automatic count");
        assert_eq!(config.body.radius_m, 6_371_000.0);
        assert!(config.flight.start_altitude_m > config.flight.end_altitude_m);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(geosphere: (detail: 3), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.geosphere.detail, 3);
        assert_eq!(config.geosphere.max_split_operations, 128);
        assert_eq!(config.body, BodyConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok(), "unknown fields should be ignored: {result:?}");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.body.name = "Luna".to_string();
        config.body.radius_m = 1_737_400.0;
        config.geosphere.detail = 4;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let config = Config::load_or_create(&nested).unwrap();
        assert_eq!(config, Config::default());
        assert!(nested.join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.jobs.worker_threads = 3;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.jobs.worker_threads), Some(3));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))), "got {result:?}");
    }

    #[test]
    fn test_ron_comments_accepted() {
        let ron_str = "// flight plan\n(\n  // nothing overridden\n)";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config, Config::default());
    }
}
