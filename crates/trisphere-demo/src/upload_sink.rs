//! Stand-in renderer: does the per-mesh work a GPU upload would.

use trisphere_lod::{MeshSink, PatchId, RecordingSink};
use trisphere_mesh::{PatchMesh, compute_normals};

/// Computes normals and counts upload bytes for every published mesh, then
/// records visibility in a [`RecordingSink`].
#[derive(Debug, Default)]
pub(crate) struct UploadSink {
    visible: RecordingSink,
    uploaded_bytes: u64,
    normals_computed: u64,
    flat_vertices: u64,
}

impl UploadSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn visible(&self) -> &RecordingSink {
        &self.visible
    }

    /// Bytes of positions, indices and normals handed over so far.
    pub(crate) fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub(crate) fn normals_computed(&self) -> u64 {
        self.normals_computed
    }

    /// Vertices whose normal came out zero (no adjacent area).
    pub(crate) fn flat_vertices(&self) -> u64 {
        self.flat_vertices
    }
}

impl MeshSink for UploadSink {
    fn publish_mesh(&mut self, patch: PatchId, mesh: &PatchMesh) {
        let normals = compute_normals(mesh);
        self.normals_computed += normals.len() as u64;
        self.flat_vertices += normals.iter().filter(|n| **n == [0.0; 3]).count() as u64;

        let normal_bytes = std::mem::size_of_val(normals.as_slice());
        self.uploaded_bytes +=
            (mesh.position_bytes().len() + mesh.index_bytes().len() + normal_bytes) as u64;

        self.visible.publish_mesh(patch, mesh);
    }

    fn clear_mesh(&mut self, patch: PatchId) {
        self.visible.clear_mesh(patch);
    }
}
