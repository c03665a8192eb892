//! Normalized fractal Brownian motion (fBm) over 3D simplex noise.
//!
//! Elevation is sampled per unit-sphere direction so there are no UV seams, and
//! deeper quadtree levels composite more octaves to add finer detail.

use glam::DVec3;
use noise::{NoiseFn, Simplex};

/// Parameters of the planet's fractal height function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseParams {
    /// Seed for the simplex permutation table.
    pub seed: u32,
    /// Frequency of the first octave, in cycles per unit of direction length.
    pub base_frequency: f64,
    /// Amplitude of the first octave before normalization.
    pub base_amplitude: f64,
    /// Octaves sampled at level 0. Each quadtree level adds one more.
    pub octave_count: i32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Scale applied to the normalized value to obtain a height in world units.
    pub final_value_multiplier: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 0,
            base_frequency: 1.0,
            base_amplitude: 1.0,
            octave_count: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            final_value_multiplier: 1.0,
        }
    }
}

/// Deterministic height field keyed by [`NoiseParams::seed`].
///
/// Holds no mutable state, so a single instance is shared by every
/// tessellation worker.
#[derive(Clone)]
pub struct NoiseField {
    noise: Simplex,
    params: NoiseParams,
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl NoiseField {
    /// Build the field for the given parameters.
    pub fn new(params: NoiseParams) -> Self {
        Self {
            noise: Simplex::new(params.seed),
            params,
        }
    }

    /// Number of octaves composited at the given quadtree level.
    ///
    /// May be zero or negative when `octave_count` is negative.
    pub fn octaves_at(&self, level: u32) -> i64 {
        i64::from(self.params.octave_count) + i64::from(level)
    }

    /// Sample the normalized fractal sum in the direction `direction`.
    ///
    /// Returns a value in roughly `[-1, 1]`. When no octaves are active, or the
    /// octave amplitudes sum to zero, the result is exactly `0.0` (sea level).
    pub fn sample(&self, direction: DVec3, level: u32) -> f64 {
        let octaves = self.octaves_at(level);
        if octaves <= 0 {
            return 0.0;
        }

        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.base_amplitude;
        let mut total = 0.0;
        let mut max_amplitude = 0.0;

        for _ in 0..octaves {
            let p = direction * frequency;
            total += self.noise.get([p.x, p.y, p.z]) * amplitude;
            max_amplitude += amplitude;

            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        if max_amplitude == 0.0 {
            return 0.0;
        }
        total / max_amplitude
    }

    /// Height above sea level in world units: `sample * final_value_multiplier`.
    pub fn elevation(&self, direction: DVec3, level: u32) -> f64 {
        self.sample(direction, level) * self.params.final_value_multiplier
    }

    /// Parameters this field was built from.
    pub fn params(&self) -> &NoiseParams {
        &self.params
    }
}
