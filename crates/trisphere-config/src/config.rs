//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Planet shape and patch resolution.
    pub planet: PlanetSettings,
    /// Height field.
    pub noise: NoiseSettings,
    /// Subdivide/merge distances.
    pub lod: LodSettings,
    /// Tessellation worker pool.
    pub workers: WorkerSettings,
    /// Headless camera flight.
    pub demo: DemoSettings,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Planet shape and patch resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetSettings {
    /// Sphere radius in world units.
    pub radius: f64,
    /// Patch resolution exponent: `2^n + 1` vertices per patch edge.
    pub mesh_subdivisions: u32,
    /// Deepest quadtree level a patch may reach.
    pub max_levels: u32,
}

/// Fractal noise parameters for terrain height.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseSettings {
    pub seed: u32,
    pub base_frequency: f64,
    pub base_amplitude: f64,
    /// Octaves at level 0; each quadtree level adds one.
    pub octave_count: i32,
    pub lacunarity: f64,
    pub persistence: f64,
    /// Height scale in world units.
    pub final_value_multiplier: f64,
}

/// Distance tuning for the patch tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodSettings {
    /// Subdivide when closer than `edge length * subdivide_factor`.
    pub subdivide_factor: f64,
    /// Merge when farther than `subdivide distance * merge_hysteresis`.
    pub merge_hysteresis: f64,
}

/// Tessellation worker pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerSettings {
    /// Worker threads (0 = number of CPUs minus two, at least one).
    pub threads: usize,
}

/// Headless camera flight used by the demo binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoSettings {
    /// Ticks to run in total (half descending, half climbing).
    pub ticks: u32,
    /// Sleep between ticks in milliseconds (0 = run flat out).
    pub tick_millis: u64,
    /// Camera altitude above the surface at the start and end.
    pub start_altitude: f64,
    /// Lowest camera altitude, reached halfway through.
    pub closest_altitude: f64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "trisphere_lod=debug").
    pub log_level: String,
}

impl Default for PlanetSettings {
    fn default() -> Self {
        Self {
            radius: 1000.0,
            mesh_subdivisions: 4,
            max_levels: 8,
        }
    }
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            base_frequency: 1.0,
            base_amplitude: 1.0,
            octave_count: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            final_value_multiplier: 20.0,
        }
    }
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            subdivide_factor: 1.0,
            merge_hysteresis: 1.25,
        }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            ticks: 400,
            tick_millis: 0,
            start_altitude: 4000.0,
            closest_altitude: 2.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// `<platform config dir>/trisphere`.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|d| d.join("trisphere"))
        .ok_or(ConfigError::NoConfigDir)
}

impl Config {
    /// Load `config.ron` from the given directory, or write a default one.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save to the given directory as `config.ron`, creating it if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)
    }

    /// Re-read the file: `Some(new_config)` if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;
        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }
}
