//! Turns the loaded [`Config`] into validated tree inputs.

use trisphere_config::Config;
use trisphere_lod::{LodError, LodSettings, WorkerMode};
use trisphere_terrain::{NoiseParams, PlanetConfig};

/// Everything [`trisphere_lod::LodTree::new`] needs.
#[derive(Clone, Debug)]
pub(crate) struct TreeInputs {
    pub(crate) planet: PlanetConfig,
    pub(crate) noise: NoiseParams,
    pub(crate) lod: LodSettings,
    pub(crate) mode: WorkerMode,
}

pub(crate) fn tree_inputs(config: &Config) -> Result<TreeInputs, LodError> {
    let planet = PlanetConfig::new(
        config.planet.radius,
        config.planet.mesh_subdivisions,
        config.planet.max_levels,
    )?;

    let n = &config.noise;
    let noise = NoiseParams {
        seed: n.seed,
        base_frequency: n.base_frequency,
        base_amplitude: n.base_amplitude,
        octave_count: n.octave_count,
        lacunarity: n.lacunarity,
        persistence: n.persistence,
        final_value_multiplier: n.final_value_multiplier,
    };

    let lod = LodSettings {
        subdivide_factor: config.lod.subdivide_factor,
        merge_hysteresis: config.lod.merge_hysteresis,
    };
    lod.validate()?;

    let mode = match config.workers.threads {
        0 => WorkerMode::automatic(),
        n => WorkerMode::Threaded(n),
    };

    Ok(TreeInputs {
        planet,
        noise,
        lod,
        mode,
    })
}
