//! Headless trisphere demo.
//!
//! Seeds an icosahedral planet, flies a camera down to the surface and back
//! out, and logs how the patch tree refines and coarsens along the way.

mod flight;
mod setup;
mod upload_sink;

use std::error::Error;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::DVec3;
use tracing::{error, info, warn};
use trisphere_config::{CliArgs, Config, default_config_dir};
use trisphere_lod::{LodTree, TickReport};

use crate::flight::Flight;
use crate::upload_sink::UploadSink;

/// Ticks between progress lines.
const REPORT_EVERY: u32 = 50;

/// Running totals over many [`TickReport`]s.
#[derive(Debug, Default)]
struct Totals {
    builds: usize,
    discarded: usize,
    subdivisions: usize,
    merges: usize,
    destroyed: usize,
    faults: usize,
}

impl Totals {
    fn add(&mut self, report: &TickReport) {
        self.builds += report.builds_completed;
        self.discarded += report.builds_discarded;
        self.subdivisions += report.subdivisions;
        self.merges += report.merges;
        self.destroyed += report.patches_destroyed;
        self.faults += report.faults.len();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone() {
        Some(dir) => dir,
        None => default_config_dir()?,
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    if let Err(e) = trisphere_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config))
    {
        eprintln!("Logging unavailable: {e}");
    }

    if let Err(e) = run(&config) {
        error!("Demo failed: {e}");
        return Err(e);
    }
    Ok(())
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let inputs = setup::tree_inputs(config)?;
    info!(
        radius = inputs.planet.radius(),
        max_levels = inputs.planet.max_levels(),
        mode = ?inputs.mode,
        "Starting planet flight"
    );

    let mut tree = LodTree::new(inputs.planet, inputs.noise, inputs.lod, inputs.mode)?;
    let roots = tree.add_icosahedron_roots();

    // Aim at the middle of the first root face.
    let direction = tree
        .patch(roots[0])
        .map(|root| root.corners().into_iter().sum::<DVec3>())
        .unwrap_or(DVec3::Y);
    let flight = Flight::new(&config.demo, config.planet.radius, direction);

    let mut sink = UploadSink::new();
    let mut totals = Totals::default();
    let mut deepest = 0;
    let started = Instant::now();

    for tick in 0..config.demo.ticks {
        let report = tree.tick(flight.camera_at(tick), &mut sink);
        totals.add(&report);
        deepest = deepest.max(tree.max_depth());

        if tick == config.demo.ticks / 2 {
            info!(
                altitude = flight.altitude_at(tick),
                depth = tree.max_depth(),
                "Closest approach, climbing"
            );
        }
        if tick % REPORT_EVERY == 0 {
            info!(
                tick,
                altitude = format_args!("{:.2}", flight.altitude_at(tick)),
                climbing = flight.is_climbing(tick),
                live = tree.live_patches(),
                visible = sink.visible().visible_count(),
                triangles = sink.visible().total_triangles(),
                depth = tree.max_depth(),
                in_flight = tree.in_flight_builds(),
                "Tick"
            );
        }
        if config.demo.tick_millis > 0 {
            std::thread::sleep(Duration::from_millis(config.demo.tick_millis));
        }
    }

    if totals.faults > 0 {
        warn!(faults = totals.faults, "Tree reported faults during the flight");
    }
    if sink.visible().republish_count() > 0 || sink.visible().unknown_clear_count() > 0 {
        warn!(
            republished = sink.visible().republish_count(),
            unknown_clears = sink.visible().unknown_clear_count(),
            "Renderer saw inconsistent visibility updates"
        );
    }

    info!(
        ticks = tree.tick_count(),
        seconds = format_args!("{:.2}", started.elapsed().as_secs_f64()),
        builds = totals.builds,
        discarded = totals.discarded,
        subdivisions = totals.subdivisions,
        merges = totals.merges,
        destroyed = totals.destroyed,
        deepest,
        uploaded_mib = format_args!("{:.1}", sink.uploaded_bytes() as f64 / (1024.0 * 1024.0)),
        flat_vertices = sink.flat_vertices(),
        "Flight finished"
    );

    let teardown = tree.clear(&mut sink);
    info!(
        destroyed = teardown.patches_destroyed,
        cleared = teardown.meshes_cleared,
        still_visible = sink.visible().visible_count(),
        "Planet torn down"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flight_runs_clean() {
        let mut config = Config::default();
        config.planet.radius = 100.0;
        config.planet.mesh_subdivisions = 2;
        config.planet.max_levels = 2;
        config.workers.threads = 2;
        config.demo.ticks = 60;
        config.demo.start_altitude = 400.0;
        config.demo.closest_altitude = 1.0;
        assert!(run(&config).is_ok());
    }

    #[test]
    fn test_totals_accumulate() {
        let mut totals = Totals::default();
        let report = TickReport {
            builds_completed: 4,
            merges: 1,
            patches_destroyed: 4,
            ..Default::default()
        };
        totals.add(&report);
        totals.add(&report);
        assert_eq!(totals.builds, 8);
        assert_eq!(totals.merges, 2);
        assert_eq!(totals.destroyed, 8);
        assert_eq!(totals.faults, 0);
    }
}
