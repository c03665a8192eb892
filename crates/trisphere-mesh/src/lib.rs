//! Patch tessellation: turns three corner directions into a displaced
//! triangular vertex/index buffer, plus the normal and winding helpers the
//! renderer applies afterwards.

pub mod patch_mesh;
pub mod resolution;
pub mod tessellate;
pub mod winding;

pub use patch_mesh::{PatchMesh, compute_normals};
pub use resolution::{MeshError, Resolution};
pub use tessellate::{patch_indices, tessellate};
pub use winding::{signed_volume, triangle_winds_outward};
