//! Renderer hand-off.

use hashbrown::HashMap;
use trisphere_mesh::PatchMesh;

use crate::arena::PatchId;

/// Receives visibility changes from the tree.
///
/// Called only from the tick thread. A patch is published at most once
/// between clears; the mesh reference is valid only for the call.
pub trait MeshSink {
    /// Show `mesh` for `patch`.
    fn publish_mesh(&mut self, patch: PatchId, mesh: &PatchMesh);
    /// Stop showing `patch`.
    fn clear_mesh(&mut self, patch: PatchId);
}

/// In-memory [`MeshSink`] that tracks the visible set.
#[derive(Debug, Default)]
pub struct RecordingSink {
    visible: HashMap<PatchId, usize>,
    triangles: usize,
    publishes: u64,
    clears: u64,
    republishes: u64,
    unknown_clears: u64,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `patch` is currently shown.
    pub fn is_visible(&self, patch: PatchId) -> bool {
        self.visible.contains_key(&patch)
    }

    /// Ids of all shown patches, in no particular order.
    pub fn visible(&self) -> impl Iterator<Item = PatchId> + '_ {
        self.visible.keys().copied()
    }

    /// Number of shown patches.
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Triangles across all shown patches.
    pub fn total_triangles(&self) -> usize {
        self.triangles
    }

    /// Total `publish_mesh` calls.
    pub fn publish_count(&self) -> u64 {
        self.publishes
    }

    /// Total `clear_mesh` calls.
    pub fn clear_count(&self) -> u64 {
        self.clears
    }

    /// Publishes of a patch that was already visible. Always 0 for a correct tree.
    pub fn republish_count(&self) -> u64 {
        self.republishes
    }

    /// Clears of a patch that was not visible. Always 0 for a correct tree.
    pub fn unknown_clear_count(&self) -> u64 {
        self.unknown_clears
    }
}

impl MeshSink for RecordingSink {
    fn publish_mesh(&mut self, patch: PatchId, mesh: &PatchMesh) {
        self.publishes += 1;
        let tris = mesh.triangle_count();
        if let Some(old) = self.visible.insert(patch, tris) {
            self.republishes += 1;
            self.triangles -= old;
        }
        self.triangles += tris;
    }

    fn clear_mesh(&mut self, patch: PatchId) {
        self.clears += 1;
        match self.visible.remove(&patch) {
            Some(tris) => self.triangles -= tris,
            None => self.unknown_clears += 1,
        }
    }
}
