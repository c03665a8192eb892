//! Configuration for the trisphere planet renderer.
//!
//! Settings persist to disk as a RON file, tolerate missing and unknown
//! fields, and can be overridden from the command line.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, DemoSettings, LodSettings, NoiseSettings, PlanetSettings, WorkerSettings,
    default_config_dir,
};
pub use error::ConfigError;
