//! Patch nodes and the geometric rules that drive subdivision.

use glam::DVec3;
use trisphere_mesh::PatchMesh;

use crate::arena::PatchId;

/// Lifecycle state of a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatchState {
    /// Created, no build requested yet.
    Unbuilt,
    /// Tessellation in flight on the worker pool.
    Building,
    /// Built and visible, no children.
    Leaf,
    /// Has four children that are still building; this patch stays visible.
    DividedPending,
    /// All four children are built; this patch is hidden in their favour.
    Divided,
}

impl PatchState {
    /// Returns `true` for the two subdivided states.
    pub fn is_divided(self) -> bool {
        matches!(self, PatchState::DividedPending | PatchState::Divided)
    }
}

/// Fixed merge decision anchor, captured when a patch first subdivides.
///
/// The merge test compares the camera against this stored centre and
/// threshold rather than recomputing them each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergeAnchor {
    /// World-space centre of the undivided patch.
    pub center: DVec3,
    /// Camera distance at or beyond which the patch merges back.
    pub threshold: f64,
}

impl MergeAnchor {
    /// Anchor for a patch with the given corners.
    pub fn for_patch(
        corners: [DVec3; 3],
        radius: f64,
        subdivide_factor: f64,
        merge_hysteresis: f64,
    ) -> Self {
        Self {
            center: patch_center(corners, radius),
            threshold: subdivide_distance(corners, radius, subdivide_factor) * merge_hysteresis,
        }
    }

    /// Returns `true` when the camera is far enough away to merge.
    pub fn should_merge(&self, camera: DVec3) -> bool {
        camera.distance(self.center) >= self.threshold
    }
}

/// One triangular cell of the planet quadtree.
#[derive(Clone, Debug)]
pub struct PatchNode {
    pub(crate) level: u32,
    pub(crate) corners: [DVec3; 3],
    pub(crate) parent: Option<PatchId>,
    pub(crate) children: Option<[PatchId; 4]>,
    pub(crate) state: PatchState,
    pub(crate) children_built: u8,
    pub(crate) merge_anchor: Option<MergeAnchor>,
    pub(crate) parent_anchor: Option<MergeAnchor>,
    pub(crate) geometry: Option<PatchMesh>,
    pub(crate) published: bool,
}

impl PatchNode {
    /// A level-0 patch with no parent.
    pub fn root(corners: [DVec3; 3]) -> Self {
        Self {
            level: 0,
            corners,
            parent: None,
            children: None,
            state: PatchState::Unbuilt,
            children_built: 0,
            merge_anchor: None,
            parent_anchor: None,
            geometry: None,
            published: false,
        }
    }

    pub(crate) fn child(
        corners: [DVec3; 3],
        level: u32,
        parent: PatchId,
        parent_anchor: MergeAnchor,
    ) -> Self {
        Self {
            level,
            parent: Some(parent),
            parent_anchor: Some(parent_anchor),
            ..Self::root(corners)
        }
    }

    /// Depth from the root (root = 0).
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Unit-sphere corner directions.
    pub fn corners(&self) -> [DVec3; 3] {
        self.corners
    }

    /// Parent patch, `None` for roots.
    pub fn parent(&self) -> Option<PatchId> {
        self.parent
    }

    /// The four children, if subdivided.
    pub fn children(&self) -> Option<[PatchId; 4]> {
        self.children
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PatchState {
        self.state
    }

    /// Children whose builds completed since this patch subdivided.
    pub fn children_built(&self) -> u8 {
        self.children_built
    }

    /// This patch's own merge anchor, set the first time it subdivides.
    pub fn merge_anchor(&self) -> Option<MergeAnchor> {
        self.merge_anchor
    }

    /// The parent's merge anchor, shared by all four siblings.
    pub fn parent_anchor(&self) -> Option<MergeAnchor> {
        self.parent_anchor
    }

    /// Built geometry, retained while subdivided so a merge needs no rebuild.
    pub fn geometry(&self) -> Option<&PatchMesh> {
        self.geometry.as_ref()
    }

    /// Whether the renderer currently shows this patch.
    pub fn is_published(&self) -> bool {
        self.published
    }
}

/// World-space centre of a patch: the normalized corner sum scaled to `radius`.
pub fn patch_center(corners: [DVec3; 3], radius: f64) -> DVec3 {
    let [c0, c1, c2] = corners;
    (c0 + c1 + c2).normalize() * radius
}

/// Camera distance below which a patch subdivides.
///
/// The length of the first edge, scaled to the planet, times `factor`.
pub fn subdivide_distance(corners: [DVec3; 3], radius: f64, factor: f64) -> f64 {
    let [c0, c1, _] = corners;
    (c0 * radius).distance(c1 * radius) * factor
}

/// Split a patch into its four children.
///
/// Each edge midpoint is computed once and pushed back onto the unit sphere,
/// so adjacent children share bit-identical corners. Children keep the
/// parent's orientation:
///
/// ```text
/// 0: (c0,  m01, m02)   corner at c0
/// 1: (m01, c1,  m12)   corner at c1
/// 2: (m02, m12, c2 )   corner at c2
/// 3: (m02, m01, m12)   centre
/// ```
pub fn split_corners(corners: [DVec3; 3]) -> [[DVec3; 3]; 4] {
    let [c0, c1, c2] = corners;
    let m01 = edge_midpoint(c0, c1);
    let m02 = edge_midpoint(c0, c2);
    let m12 = edge_midpoint(c1, c2);

    [
        [c0, m01, m02],
        [m01, c1, m12],
        [m02, m12, c2],
        [m02, m01, m12],
    ]
}

fn edge_midpoint(a: DVec3, b: DVec3) -> DVec3 {
    (a + (b - a) * 0.5).normalize()
}
