//! Triangular-lattice tessellation of one spherical patch.
//!
//! The patch is walked row by row from `corner0`: row `i` holds `i + 1`
//! vertices, so the lattice is triangular rather than square and no vertex is
//! emitted twice. Every lattice point is pushed onto the unit sphere, displaced
//! by the noise field and scaled to the planet radius.

use glam::DVec3;
use trisphere_terrain::{NoiseField, PlanetConfig};

use crate::patch_mesh::PatchMesh;
use crate::resolution::Resolution;

/// Tessellate a patch into a displaced vertex/index buffer.
///
/// - `corners`: unit-sphere directions of the patch corners
/// - `resolution`: vertices per patch edge
/// - `level`: quadtree level, forwarded to the noise field for octave scaling
///
/// Pure and safe to call from any thread. Triangles take the orientation of
/// `corners`: counter-clockwise corners (seen from outside) give outward
/// facing triangles.
pub fn tessellate(
    corners: [DVec3; 3],
    resolution: Resolution,
    level: u32,
    planet: &PlanetConfig,
    noise: &NoiseField,
) -> PatchMesh {
    let rez = resolution.get();
    let [c0, c1, c2] = corners;
    let steps = f64::from(rez - 1);

    // Per-step edge vectors along c0 -> c1 (rows) and c1 -> c2 (columns).
    let add1 = (c1 - c0) / steps;
    let add2 = (c2 - c1) / steps;

    let mut mesh = PatchMesh::with_capacity(resolution.vertex_count(), resolution.index_count());

    for i in 0..rez {
        for n in 0..=i {
            let lattice = c0 + add1 * f64::from(i) + add2 * f64::from(n);
            let direction = lattice.normalize();
            let height = planet.radius() + noise.elevation(direction, level);
            let p = direction * height;
            mesh.positions.push([p.x as f32, p.y as f32, p.z as f32]);
        }
    }

    mesh.indices = patch_indices(resolution);
    mesh
}

/// Index buffer for a triangular lattice with `resolution` vertices per edge.
///
/// Independent of corner positions, so it can be shared by every patch of the
/// same resolution.
pub fn patch_indices(resolution: Resolution) -> Vec<u32> {
    let rez = resolution.get();
    let mut indices = Vec::with_capacity(resolution.index_count());

    let mut prev_row_start = 0u32;
    let mut row_start = 1u32;

    // `row` is the upper row of each strip; the strip below it has one more vertex.
    for row in 0..rez - 1 {
        let tris_in_row = 1 + row * 2;
        let mut upright = true;
        let mut up = 0u32;
        let mut down = 0u32;

        for _ in 0..tris_in_row {
            if upright {
                indices.extend_from_slice(&[
                    prev_row_start + up,
                    row_start + up,
                    row_start + up + 1,
                ]);
                up += 1;
            } else {
                indices.extend_from_slice(&[
                    prev_row_start + down,
                    row_start + down + 1,
                    prev_row_start + down + 1,
                ]);
                down += 1;
            }
            upright = !upright;
        }

        prev_row_start = row_start;
        row_start += row + 2;
    }

    indices
}
