//! Vertex/index buffer for one tessellated patch.

use glam::Vec3;

/// The geometry of one patch, ready for upload.
///
/// Positions are planet-relative (planet centre at the origin) and already
/// displaced by the height field. Indices describe a triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatchMesh {
    /// Displaced vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
}

impl PatchMesh {
    /// Create an empty mesh with room for the given vertex and index counts.
    pub fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
        }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate over triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Position buffer as raw bytes for GPU upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Index buffer as raw bytes for GPU upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Approximate heap footprint of the buffers in bytes.
    pub fn byte_size(&self) -> usize {
        self.positions.len() * std::mem::size_of::<[f32; 3]>()
            + self.indices.len() * std::mem::size_of::<u32>()
    }
}

/// Recompute smooth vertex normals by area-weighted face averaging.
///
/// Each triangle contributes its unnormalized cross product (twice its area
/// along the face normal) to its three vertices. Vertices touched by no
/// triangle, or whose contributions cancel, get a zero normal.
pub fn compute_normals(mesh: &PatchMesh) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; mesh.positions.len()];

    for [a, b, c] in mesh.triangles() {
        let p0 = Vec3::from(mesh.positions[a as usize]);
        let p1 = Vec3::from(mesh.positions[b as usize]);
        let p2 = Vec3::from(mesh.positions[c as usize]);
        let face = (p1 - p0).cross(p2 - p0);
        accum[a as usize] += face;
        accum[b as usize] += face;
        accum[c as usize] += face;
    }

    accum
        .into_iter()
        .map(|n| n.normalize_or_zero().to_array())
        .collect()
}
