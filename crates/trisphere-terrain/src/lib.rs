//! Planet parameters and procedural elevation: fractal simplex noise sampled per
//! unit-sphere direction.

mod noise_field;
mod planet;

pub use noise_field::{NoiseField, NoiseParams};
pub use planet::{MAX_MESH_SUBDIVISIONS, PlanetConfig, TerrainError};
