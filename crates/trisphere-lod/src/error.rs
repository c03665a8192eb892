//! LOD tree error types.

use trisphere_mesh::MeshError;
use trisphere_terrain::TerrainError;

use crate::arena::PatchId;

/// Errors raised while building or evaluating the patch tree.
#[derive(Debug, thiserror::Error)]
pub enum LodError {
    /// Planet or noise configuration was rejected.
    #[error(transparent)]
    Terrain(#[from] TerrainError),

    /// The configured patch resolution cannot be tessellated.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// `subdivide_factor` must be positive and finite.
    #[error("subdivide factor must be positive and finite, got {0}")]
    InvalidSubdivideFactor(f64),

    /// `merge_hysteresis` must be at least 1 so merging never undercuts subdividing.
    #[error("merge hysteresis must be finite and >= 1.0, got {0}")]
    InvalidMergeHysteresis(f64),

    /// A build was requested for a patch that already has one in flight.
    #[error("{0} already has a build in flight")]
    AlreadyPending(PatchId),

    /// The id does not resolve to a live patch.
    #[error("{0} does not refer to a live patch")]
    UnknownPatch(PatchId),

    /// The state machine reached an impossible configuration.
    #[error("invariant violated at {patch}: {reason}")]
    InvariantViolation {
        /// The offending patch.
        patch: PatchId,
        /// What was wrong.
        reason: String,
    },

    /// A tessellation worker thread could not be started.
    #[error("failed to spawn build worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The scheduler was shut down and accepts no more builds.
    #[error("build scheduler is shut down")]
    SchedulerClosed,
}

impl LodError {
    pub(crate) fn invariant(patch: PatchId, reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            patch,
            reason: reason.into(),
        }
    }
}
