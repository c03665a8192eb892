//! Patch quadtree level-of-detail: distance-driven subdivide/merge with
//! hysteresis, asynchronous tessellation on a worker pool, and hand-off of
//! finished geometry to the renderer.

mod arena;
mod error;
mod patch;
mod roots;
mod scheduler;
mod sink;
mod tree;

pub use arena::{PatchArena, PatchId};
pub use error::LodError;
pub use patch::{MergeAnchor, PatchNode, PatchState, patch_center, split_corners, subdivide_distance};
pub use roots::icosahedron_faces;
pub use scheduler::{BuildHandle, BuildRequest, BuildScheduler, CompletedBuild, PendingBuild, WorkerMode};
pub use sink::{MeshSink, RecordingSink};
pub use tree::{LodSettings, LodTree, TickReport};
