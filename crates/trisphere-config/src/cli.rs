//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Trisphere command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "trisphere", about = "Adaptive planet terrain")]
pub struct CliArgs {
    /// Planet radius in world units.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Patch resolution exponent (2^n + 1 vertices per edge).
    #[arg(long)]
    pub subdivisions: Option<u32>,

    /// Maximum quadtree depth.
    #[arg(long)]
    pub max_levels: Option<u32>,

    /// Terrain noise seed.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Tessellation worker threads (0 = automatic).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Number of demo ticks to run.
    #[arg(long)]
    pub ticks: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(radius) = args.radius {
            self.planet.radius = radius;
        }
        if let Some(subdivisions) = args.subdivisions {
            self.planet.mesh_subdivisions = subdivisions;
        }
        if let Some(levels) = args.max_levels {
            self.planet.max_levels = levels;
        }
        if let Some(seed) = args.seed {
            self.noise.seed = seed;
        }
        if let Some(threads) = args.threads {
            self.workers.threads = threads;
        }
        if let Some(ticks) = args.ticks {
            self.demo.ticks = ticks;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
