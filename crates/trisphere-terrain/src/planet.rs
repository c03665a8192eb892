//! Immutable planet geometry shared by every patch of the tree.

/// Largest accepted patch resolution exponent (4097 vertices per patch edge).
pub const MAX_MESH_SUBDIVISIONS: u32 = 12;

/// Errors raised while validating planet or noise configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    /// The sphere radius was zero, negative, NaN or infinite.
    #[error("planet radius must be positive and finite, got {0}")]
    InvalidRadius(f64),

    /// The patch resolution exponent is larger than [`MAX_MESH_SUBDIVISIONS`].
    #[error("mesh subdivision exponent {0} exceeds the maximum of {MAX_MESH_SUBDIVISIONS}")]
    SubdivisionsOutOfRange(u32),
}

/// Geometry parameters of one planet.
///
/// Created once, then shared read-only (behind an `Arc`) by the LOD tree and
/// every tessellation job.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanetConfig {
    radius: f64,
    mesh_subdivisions: u32,
    max_levels: u32,
}

impl PlanetConfig {
    /// Create a validated planet configuration.
    ///
    /// - `radius`: sea-level sphere radius in world units
    /// - `mesh_subdivisions`: patch resolution exponent, see [`Self::mesh_subdivisions`]
    /// - `max_levels`: deepest quadtree level a patch may subdivide to
    pub fn new(radius: f64, mesh_subdivisions: u32, max_levels: u32) -> Result<Self, TerrainError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(TerrainError::InvalidRadius(radius));
        }
        if mesh_subdivisions > MAX_MESH_SUBDIVISIONS {
            return Err(TerrainError::SubdivisionsOutOfRange(mesh_subdivisions));
        }
        Ok(Self {
            radius,
            mesh_subdivisions,
            max_levels,
        })
    }

    /// Sea-level radius in world units.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Patch resolution exponent. A patch has `2^n + 1` vertices along each edge.
    pub fn mesh_subdivisions(&self) -> u32 {
        self.mesh_subdivisions
    }

    /// Maximum quadtree depth (root = 0).
    pub fn max_levels(&self) -> u32 {
        self.max_levels
    }
}
