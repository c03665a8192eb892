//! Validated patch resolution (vertices per triangle edge).

use trisphere_terrain::MAX_MESH_SUBDIVISIONS;

/// Errors raised when a patch resolution cannot be tessellated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    /// Fewer than two vertices per edge cannot form a triangle.
    #[error("patch resolution must be at least 2 vertices per edge, got {0}")]
    InvalidResolution(u32),

    /// The resolution would produce more vertices than a patch is allowed to hold.
    #[error("patch resolution {0} exceeds the maximum of {max}", max = Resolution::MAX.get())]
    ResolutionTooLarge(u32),

    /// The subdivision exponent overflows the resolution range.
    #[error("subdivision exponent {0} is out of range")]
    SubdivisionsOutOfRange(u32),
}

/// Number of vertices along each edge of a triangular patch.
///
/// Constructed through [`Resolution::new`] or [`Resolution::from_subdivisions`],
/// so a `Resolution` in hand is always tessellatable. Validation therefore
/// happens where builds are requested, never inside a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resolution(u32);

impl Resolution {
    /// Smallest resolution: a single triangle.
    pub const MIN: Resolution = Resolution(2);

    /// Largest resolution, reached at the maximum subdivision exponent.
    pub const MAX: Resolution = Resolution((1 << MAX_MESH_SUBDIVISIONS) + 1);

    /// Validate a raw vertices-per-edge count.
    pub fn new(rez: u32) -> Result<Self, MeshError> {
        if rez < Self::MIN.0 {
            return Err(MeshError::InvalidResolution(rez));
        }
        if rez > Self::MAX.0 {
            return Err(MeshError::ResolutionTooLarge(rez));
        }
        Ok(Self(rez))
    }

    /// Resolution for a subdivision exponent: `2 + (2^exponent - 1)`.
    pub fn from_subdivisions(exponent: u32) -> Result<Self, MeshError> {
        // The parenthesized term is the Mersenne number 2^n - 1.
        let mersenne = 1u32
            .checked_shl(exponent)
            .map(|p| p - 1)
            .ok_or(MeshError::SubdivisionsOutOfRange(exponent))?;
        let rez = mersenne
            .checked_add(2)
            .ok_or(MeshError::SubdivisionsOutOfRange(exponent))?;
        Self::new(rez)
    }

    /// Vertices per edge.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Total vertex count: the triangular number `rez * (rez + 1) / 2`.
    pub fn vertex_count(self) -> usize {
        let rez = self.0 as usize;
        rez * (rez + 1) / 2
    }

    /// Total triangle count: `t * (t + 1) + (rez - 1)` with `t = rez - 2`.
    pub fn triangle_count(self) -> usize {
        let rez = self.0 as usize;
        let t = rez - 2;
        t * (t + 1) + (rez - 1)
    }

    /// Length of the index buffer (three indices per triangle).
    pub fn index_count(self) -> usize {
        self.triangle_count() * 3
    }
}
