//! Distance-driven subdivide/merge state machine over the patch arena.
//!
//! Each [`tick`](LodTree::tick) first adopts finished builds, then walks the
//! tree from the roots:
//!
//! - `Unbuilt` patches are scheduled and become `Building`.
//! - A `Leaf` closer than its subdivide distance splits into four `Unbuilt`
//!   children and becomes `DividedPending`. It stays visible meanwhile.
//! - A `DividedPending` patch whose four children are built becomes `Divided`
//!   and is hidden.
//! - A subdivided patch whose merge anchor is out of range destroys its whole
//!   subtree and is shown again from its retained geometry.
//!
//! Merging is checked against the anchor stored at subdivision time, with a
//! threshold scaled by `merge_hysteresis`, so a camera hovering at the split
//! distance does not thrash.

use std::sync::Arc;

use glam::DVec3;
use tracing::{debug, error, info};
use trisphere_mesh::Resolution;
use trisphere_terrain::{NoiseField, NoiseParams, PlanetConfig};

use crate::arena::{PatchArena, PatchId};
use crate::error::LodError;
use crate::patch::{MergeAnchor, PatchNode, PatchState, patch_center, split_corners, subdivide_distance};
use crate::roots::icosahedron_faces;
use crate::scheduler::{BuildRequest, BuildScheduler, CompletedBuild, WorkerMode};
use crate::sink::MeshSink;

/// Distance tuning for subdivide and merge decisions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodSettings {
    /// Multiplier on the patch edge length giving the subdivide distance.
    pub subdivide_factor: f64,
    /// Multiplier (>= 1) on the subdivide distance giving the merge distance.
    pub merge_hysteresis: f64,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            subdivide_factor: 1.0,
            merge_hysteresis: 1.25,
        }
    }
}

impl LodSettings {
    /// Check both factors.
    pub fn validate(&self) -> Result<(), LodError> {
        if !self.subdivide_factor.is_finite() || self.subdivide_factor <= 0.0 {
            return Err(LodError::InvalidSubdivideFactor(self.subdivide_factor));
        }
        if !self.merge_hysteresis.is_finite() || self.merge_hysteresis < 1.0 {
            return Err(LodError::InvalidMergeHysteresis(self.merge_hysteresis));
        }
        Ok(())
    }
}

/// What one [`LodTree::tick`] did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Tick sequence number, starting at 1.
    pub tick: u64,
    pub builds_scheduled: usize,
    pub builds_completed: usize,
    /// Results for patches destroyed while their build was in flight.
    pub builds_discarded: usize,
    pub subdivisions: usize,
    pub merges: usize,
    pub patches_destroyed: usize,
    pub meshes_published: usize,
    pub meshes_cleared: usize,
    /// Subtrees whose evaluation was aborted this tick.
    pub faults: Vec<LodError>,
}

impl TickReport {
    /// Returns `true` if the tick changed nothing.
    pub fn is_idle(&self) -> bool {
        self.builds_scheduled == 0
            && self.builds_completed == 0
            && self.builds_discarded == 0
            && self.subdivisions == 0
            && self.merges == 0
            && self.faults.is_empty()
    }
}

/// Level-of-detail patch tree for one planet.
pub struct LodTree {
    planet: Arc<PlanetConfig>,
    settings: LodSettings,
    resolution: Resolution,
    arena: PatchArena,
    roots: Vec<PatchId>,
    scheduler: BuildScheduler,
    ticks: u64,
}

impl LodTree {
    /// Create an empty tree. Add roots with [`add_root`](Self::add_root) or
    /// [`add_icosahedron_roots`](Self::add_icosahedron_roots).
    pub fn new(
        planet: PlanetConfig,
        noise: NoiseParams,
        settings: LodSettings,
        mode: WorkerMode,
    ) -> Result<Self, LodError> {
        settings.validate()?;
        let resolution = Resolution::from_subdivisions(planet.mesh_subdivisions())?;
        let planet = Arc::new(planet);
        let noise = Arc::new(NoiseField::new(noise));
        let scheduler = BuildScheduler::new(Arc::clone(&planet), noise, mode)?;

        Ok(Self {
            planet,
            settings,
            resolution,
            arena: PatchArena::new(),
            roots: Vec::new(),
            scheduler,
            ticks: 0,
        })
    }

    /// Add a level-0 patch. Corners are unit directions, counter-clockwise
    /// when seen from outside.
    pub fn add_root(&mut self, corners: [DVec3; 3]) -> PatchId {
        let id = self.arena.insert(PatchNode::root(corners.map(DVec3::normalize)));
        self.roots.push(id);
        id
    }

    /// Seed the tree with the 20 faces of an icosahedron.
    pub fn add_icosahedron_roots(&mut self) -> Vec<PatchId> {
        let ids: Vec<_> = icosahedron_faces()
            .into_iter()
            .map(|face| self.add_root(face))
            .collect();
        info!(
            roots = ids.len(),
            radius = self.planet.radius(),
            "Seeded icosahedral planet"
        );
        ids
    }

    /// Advance one frame: adopt finished builds, then re-evaluate every patch
    /// against `camera` (planet-relative world position).
    pub fn tick(&mut self, camera: DVec3, sink: &mut dyn MeshSink) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..Default::default()
        };

        for done in self.scheduler.poll() {
            self.adopt(done, sink, &mut report);
        }

        for root in self.roots.clone() {
            if let Err(fault) = self.evaluate(root, camera, sink, &mut report) {
                record_fault(root, fault, &mut report);
            }
        }

        report
    }

    /// Destroy every patch, clearing whatever is published. In-flight builds
    /// are discarded when they complete.
    pub fn clear(&mut self, sink: &mut dyn MeshSink) -> TickReport {
        let mut report = TickReport {
            tick: self.ticks,
            ..Default::default()
        };
        for root in std::mem::take(&mut self.roots) {
            self.destroy_subtree(root, sink, &mut report);
        }
        info!(
            destroyed = report.patches_destroyed,
            in_flight = self.scheduler.in_flight_count(),
            "Cleared patch tree"
        );
        report
    }

    /// Look up a live patch.
    pub fn patch(&self, id: PatchId) -> Option<&PatchNode> {
        self.arena.get(id)
    }

    /// All live patches.
    pub fn patches(&self) -> impl Iterator<Item = (PatchId, &PatchNode)> {
        self.arena.iter()
    }

    pub fn roots(&self) -> &[PatchId] {
        &self.roots
    }

    pub fn planet(&self) -> &PlanetConfig {
        &self.planet
    }

    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    /// Vertices per patch edge.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn live_patches(&self) -> usize {
        self.arena.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.arena
            .iter()
            .filter(|(_, n)| n.state == PatchState::Leaf)
            .count()
    }

    /// Patches currently shown by the sink.
    pub fn visible_patches(&self) -> usize {
        self.arena.iter().filter(|(_, n)| n.published).count()
    }

    /// Deepest live level (0 for an empty tree).
    pub fn max_depth(&self) -> u32 {
        self.arena.iter().map(|(_, n)| n.level).max().unwrap_or(0)
    }

    pub fn in_flight_builds(&self) -> usize {
        self.scheduler.in_flight_count()
    }

    fn adopt(&mut self, done: CompletedBuild, sink: &mut dyn MeshSink, report: &mut TickReport) {
        let Some(node) = self.arena.get_mut(done.patch) else {
            debug!(patch = %done.patch, job = done.job, "Discarding build for destroyed patch");
            report.builds_discarded += 1;
            return;
        };
        if node.state != PatchState::Building {
            debug!(patch = %done.patch, job = done.job, state = ?node.state, "Discarding unexpected build");
            report.builds_discarded += 1;
            return;
        }

        sink.publish_mesh(done.patch, &done.mesh);
        node.geometry = Some(done.mesh);
        node.state = PatchState::Leaf;
        node.published = true;
        let parent = node.parent;
        report.builds_completed += 1;
        report.meshes_published += 1;
        debug!(patch = %done.patch, micros = done.build_time_us, "Adopted build");

        if let Some(parent) = parent.and_then(|p| self.arena.get_mut(p))
            && parent.state == PatchState::DividedPending
        {
            parent.children_built = parent.children_built.saturating_add(1);
        }
    }

    fn evaluate(
        &mut self,
        id: PatchId,
        camera: DVec3,
        sink: &mut dyn MeshSink,
        report: &mut TickReport,
    ) -> Result<(), LodError> {
        let node = self.arena.get(id).ok_or(LodError::UnknownPatch(id))?;
        let state = node.state;
        match state {
            PatchState::Unbuilt => self.schedule_build(id, report),
            PatchState::Building => Ok(()),
            PatchState::Leaf => {
                let radius = self.planet.radius();
                let close = camera.distance(patch_center(node.corners, radius))
                    < subdivide_distance(node.corners, radius, self.settings.subdivide_factor);
                if close && node.level < self.planet.max_levels() {
                    self.subdivide(id, report)?;
                }
                Ok(())
            }
            PatchState::DividedPending | PatchState::Divided => {
                self.evaluate_divided(id, camera, sink, report)
            }
        }
    }

    fn evaluate_divided(
        &mut self,
        id: PatchId,
        camera: DVec3,
        sink: &mut dyn MeshSink,
        report: &mut TickReport,
    ) -> Result<(), LodError> {
        let (children, anchor) = self.check_divided(id)?;

        if anchor.should_merge(camera) {
            return self.merge(id, children, sink, report);
        }

        let node = self.arena.get_mut(id).ok_or(LodError::UnknownPatch(id))?;
        if node.state == PatchState::DividedPending && node.children_built == 4 {
            node.state = PatchState::Divided;
            if node.published {
                node.published = false;
                sink.clear_mesh(id);
                report.meshes_cleared += 1;
            }
            debug!(patch = %id, level = node.level, "Children ready, hiding parent");
        }

        for child in children {
            if let Err(fault) = self.evaluate(child, camera, sink, report) {
                record_fault(child, fault, report);
            }
        }
        Ok(())
    }

    /// Structural checks for a subdivided patch. Returns its children and anchor.
    fn check_divided(&self, id: PatchId) -> Result<([PatchId; 4], MergeAnchor), LodError> {
        let node = self.arena.get(id).ok_or(LodError::UnknownPatch(id))?;
        let children = node
            .children
            .ok_or_else(|| LodError::invariant(id, "subdivided patch has no children"))?;
        if node.children_built > 4 {
            return Err(LodError::invariant(
                id,
                format!("children_built is {}", node.children_built),
            ));
        }
        let anchor = node
            .merge_anchor
            .ok_or_else(|| LodError::invariant(id, "subdivided patch has no merge anchor"))?;
        if node.geometry.is_none() {
            return Err(LodError::invariant(id, "subdivided patch has no geometry"));
        }

        for child in children {
            let c = self
                .arena
                .get(child)
                .ok_or_else(|| LodError::invariant(id, format!("child {child} is not live")))?;
            if c.level != node.level + 1 {
                return Err(LodError::invariant(
                    id,
                    format!("child {child} at level {}, expected {}", c.level, node.level + 1),
                ));
            }
            if c.parent != Some(id) {
                return Err(LodError::invariant(id, format!("child {child} has another parent")));
            }
            if c.parent_anchor != Some(anchor) {
                return Err(LodError::invariant(id, format!("child {child} has a stale anchor")));
            }
        }
        Ok((children, anchor))
    }

    fn schedule_build(&mut self, id: PatchId, report: &mut TickReport) -> Result<(), LodError> {
        let node = self.arena.get(id).ok_or(LodError::UnknownPatch(id))?;
        self.scheduler.schedule(BuildRequest {
            patch: id,
            corners: node.corners,
            resolution: self.resolution,
            level: node.level,
        })?;
        if let Some(node) = self.arena.get_mut(id) {
            node.state = PatchState::Building;
        }
        report.builds_scheduled += 1;
        Ok(())
    }

    fn subdivide(&mut self, id: PatchId, report: &mut TickReport) -> Result<(), LodError> {
        let radius = self.planet.radius();
        let settings = self.settings;
        let node = self.arena.get_mut(id).ok_or(LodError::UnknownPatch(id))?;
        let corners = node.corners;
        let level = node.level;
        let anchor = *node.merge_anchor.get_or_insert_with(|| {
            MergeAnchor::for_patch(
                corners,
                radius,
                settings.subdivide_factor,
                settings.merge_hysteresis,
            )
        });

        let children = split_corners(corners)
            .map(|c| self.arena.insert(PatchNode::child(c, level + 1, id, anchor)));

        let node = self.arena.get_mut(id).ok_or(LodError::UnknownPatch(id))?;
        node.children = Some(children);
        node.children_built = 0;
        node.state = PatchState::DividedPending;
        report.subdivisions += 1;
        debug!(patch = %id, level, "Subdivided");
        Ok(())
    }

    fn merge(
        &mut self,
        id: PatchId,
        children: [PatchId; 4],
        sink: &mut dyn MeshSink,
        report: &mut TickReport,
    ) -> Result<(), LodError> {
        for child in children {
            self.destroy_subtree(child, sink, report);
        }

        let node = self.arena.get_mut(id).ok_or(LodError::UnknownPatch(id))?;
        node.children = None;
        node.children_built = 0;
        node.state = PatchState::Leaf;
        if !node.published {
            let mesh = node
                .geometry
                .as_ref()
                .ok_or_else(|| LodError::invariant(id, "merged patch has no geometry"))?;
            sink.publish_mesh(id, mesh);
            node.published = true;
            report.meshes_published += 1;
        }
        report.merges += 1;
        debug!(patch = %id, level = node.level, "Merged");
        Ok(())
    }

    fn destroy_subtree(&mut self, root: PatchId, sink: &mut dyn MeshSink, report: &mut TickReport) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.arena.remove(id) else {
                continue;
            };
            if node.published {
                sink.clear_mesh(id);
                report.meshes_cleared += 1;
            }
            if let Some(children) = node.children {
                stack.extend(children);
            }
            report.patches_destroyed += 1;
        }
    }
}

fn record_fault(patch: PatchId, fault: LodError, report: &mut TickReport) {
    error!(%patch, error = %fault, "Aborted subtree evaluation");
    report.faults.push(fault);
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::sink::RecordingSink;
    use trisphere_mesh::PatchMesh;

    const RADIUS: f64 = 100.0;

    fn octant() -> [DVec3; 3] {
        [DVec3::X, DVec3::Y, DVec3::Z]
    }

    fn tree(max_levels: u32, settings: LodSettings) -> LodTree {
        let planet = PlanetConfig::new(RADIUS, 2, max_levels).unwrap();
        let noise = NoiseParams {
            seed: 7,
            final_value_multiplier: 2.0,
            ..Default::default()
        };
        LodTree::new(planet, noise, settings, WorkerMode::Deferred).unwrap()
    }

    /// Camera just above the octant's centre.
    fn near() -> DVec3 {
        patch_center(octant(), RADIUS) * 1.1
    }

    /// Camera far out along the octant's centre direction.
    fn far() -> DVec3 {
        patch_center(octant(), RADIUS) * 10.0
    }

    fn run(tree: &mut LodTree, camera: DVec3, sink: &mut RecordingSink, ticks: usize) {
        for _ in 0..ticks {
            let report = tree.tick(camera, sink);
            assert!(report.faults.is_empty(), "faults: {:?}", report.faults);
        }
    }

    /// Every published patch's published ancestors must be `DividedPending`,
    /// and the sink must agree with the tree about what is shown.
    fn assert_visibility_consistent(tree: &LodTree, sink: &RecordingSink) {
        let published: Vec<_> = tree
            .patches()
            .filter(|(_, n)| n.is_published())
            .map(|(id, _)| id)
            .collect();
        assert_eq!(published.len(), sink.visible_count());
        for &id in &published {
            assert!(sink.is_visible(id), "{id} published but not visible");
            let mut cursor = tree.patch(id).unwrap().parent();
            while let Some(ancestor) = cursor {
                let a = tree.patch(ancestor).expect("dangling parent id");
                if a.is_published() {
                    assert_eq!(
                        a.state(),
                        PatchState::DividedPending,
                        "{ancestor} visible together with descendant {id}"
                    );
                }
                cursor = a.parent();
            }
        }
        assert_eq!(sink.republish_count(), 0);
        assert_eq!(sink.unknown_clear_count(), 0);
    }

    #[test]
    fn test_settings_validation() {
        assert!(LodSettings::default().validate().is_ok());
        let bad_factor = LodSettings {
            subdivide_factor: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_factor.validate(),
            Err(LodError::InvalidSubdivideFactor(_))
        ));
        let bad_hysteresis = LodSettings {
            merge_hysteresis: 0.9,
            ..Default::default()
        };
        assert!(matches!(
            bad_hysteresis.validate(),
            Err(LodError::InvalidMergeHysteresis(_))
        ));
        let planet = PlanetConfig::new(RADIUS, 2, 1).unwrap();
        assert!(
            LodTree::new(planet, NoiseParams::default(), bad_hysteresis, WorkerMode::Deferred)
                .is_err()
        );
    }

    #[test]
    fn test_root_builds_then_publishes() {
        let mut tree = tree(1, LodSettings::default());
        let root = tree.add_root(octant());
        let mut sink = RecordingSink::new();

        let first = tree.tick(far(), &mut sink);
        assert_eq!(first.tick, 1);
        assert_eq!(first.builds_scheduled, 1);
        assert_eq!(tree.patch(root).unwrap().state(), PatchState::Building);
        assert!(!sink.is_visible(root));
        assert_eq!(tree.in_flight_builds(), 1);

        let second = tree.tick(far(), &mut sink);
        assert_eq!(second.builds_completed, 1);
        let node = tree.patch(root).unwrap();
        assert_eq!(node.state(), PatchState::Leaf);
        assert!(node.is_published());
        assert!(sink.is_visible(root));
        assert_eq!(
            node.geometry().map(PatchMesh::vertex_count),
            Some(tree.resolution().vertex_count())
        );
    }

    #[test]
    fn test_subdivide_scenario() {
        let mut tree = tree(1, LodSettings::default());
        let root = tree.add_root(octant());
        let mut sink = RecordingSink::new();

        run(&mut tree, near(), &mut sink, 2);
        let node = tree.patch(root).unwrap();
        assert_eq!(node.state(), PatchState::DividedPending);
        assert!(sink.is_visible(root), "parent stays visible while children build");
        let children = node.children().unwrap();
        let anchor = node.merge_anchor().unwrap();
        for child in children {
            let c = tree.patch(child).unwrap();
            assert_eq!(c.level(), 1);
            assert_eq!(c.state(), PatchState::Unbuilt);
            assert_eq!(c.parent(), Some(root));
            assert_eq!(c.parent_anchor(), Some(anchor));
        }

        let third = tree.tick(near(), &mut sink);
        assert_eq!(third.builds_scheduled, 4);
        assert_eq!(tree.patch(root).unwrap().state(), PatchState::DividedPending);

        let fourth = tree.tick(near(), &mut sink);
        assert_eq!(fourth.builds_completed, 4);
        assert_eq!(fourth.meshes_cleared, 1);
        let node = tree.patch(root).unwrap();
        assert_eq!(node.state(), PatchState::Divided);
        assert_eq!(node.children_built(), 4);
        assert!(!node.is_published());
        assert!(node.geometry().is_some(), "geometry retained for merging");
        assert!(!sink.is_visible(root));
        for child in children {
            assert_eq!(tree.patch(child).unwrap().state(), PatchState::Leaf);
            assert!(sink.is_visible(child));
        }
        assert_eq!(sink.visible_count(), 4);

        // max_levels = 1: children never split further.
        run(&mut tree, near(), &mut sink, 3);
        assert_eq!(tree.live_patches(), 5);
        assert_eq!(tree.max_depth(), 1);
        assert_eq!(tree.leaf_count(), 4);
        assert_visibility_consistent(&tree, &sink);
    }

    #[test]
    fn test_merge_scenario_restores_original_geometry() {
        let mut tree = tree(1, LodSettings::default());
        let root = tree.add_root(octant());
        let mut sink = RecordingSink::new();

        run(&mut tree, near(), &mut sink, 2);
        let original = tree.patch(root).unwrap().geometry().cloned().unwrap();
        run(&mut tree, near(), &mut sink, 2);
        let children = tree.patch(root).unwrap().children().unwrap();
        assert_eq!(tree.patch(root).unwrap().state(), PatchState::Divided);

        let report = tree.tick(far(), &mut sink);
        assert_eq!(report.merges, 1);
        assert_eq!(report.patches_destroyed, 4);
        assert_eq!(report.meshes_cleared, 4);
        assert_eq!(report.meshes_published, 1);
        assert_eq!(report.builds_scheduled, 0, "merge must not rebuild");

        let node = tree.patch(root).unwrap();
        assert_eq!(node.state(), PatchState::Leaf);
        assert!(node.children().is_none());
        assert_eq!(node.children_built(), 0);
        assert_eq!(node.geometry(), Some(&original));
        assert!(sink.is_visible(root));
        assert_eq!(sink.visible_count(), 1);
        for child in children {
            assert!(tree.patch(child).is_none(), "{child} still resolves");
            assert!(!sink.is_visible(child));
        }
        assert_eq!(tree.live_patches(), 1);
        assert_eq!(tree.in_flight_builds(), 0);
        assert_visibility_consistent(&tree, &sink);
    }

    #[test]
    fn test_hysteresis_band_holds_state() {
        let mut tree = tree(1, LodSettings::default());
        let root = tree.add_root(octant());
        let mut sink = RecordingSink::new();
        run(&mut tree, near(), &mut sink, 4);

        let anchor = tree.patch(root).unwrap().merge_anchor().unwrap();
        let split = subdivide_distance(octant(), RADIUS, 1.0);
        assert!(anchor.threshold > split);

        // Between the split and merge distances nothing changes.
        let between = anchor.center + anchor.center.normalize() * (split + anchor.threshold) * 0.5;
        for _ in 0..5 {
            let report = tree.tick(between, &mut sink);
            assert!(report.is_idle(), "unexpected work: {report:?}");
        }
        assert_eq!(tree.patch(root).unwrap().state(), PatchState::Divided);
    }

    #[test]
    fn test_merge_while_children_building() {
        let mut tree = tree(1, LodSettings::default());
        let root = tree.add_root(octant());
        let mut sink = RecordingSink::new();
        run(&mut tree, near(), &mut sink, 2);
        assert_eq!(tree.patch(root).unwrap().state(), PatchState::DividedPending);

        // Children are still Unbuilt: merging drops them without clearing anything.
        let report = tree.tick(far(), &mut sink);
        assert_eq!(report.merges, 1);
        assert_eq!(report.patches_destroyed, 4);
        assert_eq!(report.meshes_cleared, 0);
        assert_eq!(report.meshes_published, 0, "parent was never hidden");
        assert!(sink.is_visible(root));
        assert_visibility_consistent(&tree, &sink);
    }

    #[test]
    fn test_stale_builds_are_discarded() {
        let mut tree = tree(1, LodSettings::default());
        let old_root = tree.add_root(octant());
        let mut sink = RecordingSink::new();
        run(&mut tree, near(), &mut sink, 3);
        assert_eq!(tree.in_flight_builds(), 4);

        let cleared = tree.clear(&mut sink);
        assert_eq!(cleared.patches_destroyed, 5);
        assert_eq!(sink.visible_count(), 0);

        // The new root reuses a freed slot under a new generation.
        let new_root = tree.add_root(octant());
        assert_ne!(new_root, old_root);
        assert!(tree.patch(old_root).is_none());

        let report = tree.tick(far(), &mut sink);
        assert_eq!(report.builds_discarded, 4);
        assert_eq!(report.builds_completed, 0);
        assert_eq!(report.builds_scheduled, 1);
        assert_eq!(tree.live_patches(), 1);
        assert_eq!(sink.visible_count(), 0);
        assert_visibility_consistent(&tree, &sink);
    }

    #[test]
    fn test_max_levels_zero_never_subdivides() {
        let mut tree = tree(0, LodSettings::default());
        let root = tree.add_root(octant());
        let mut sink = RecordingSink::new();
        run(&mut tree, patch_center(octant(), RADIUS), &mut sink, 6);
        assert_eq!(tree.patch(root).unwrap().state(), PatchState::Leaf);
        assert_eq!(tree.live_patches(), 1);
        assert_eq!(tree.max_depth(), 0);
    }

    #[test]
    fn test_fault_isolated_to_subtree() {
        let settings = LodSettings {
            subdivide_factor: 100.0,
            ..Default::default()
        };
        let mut tree = tree(1, settings);
        let broken = tree.add_root(octant());
        let healthy = tree.add_root([DVec3::X, DVec3::Z, DVec3::NEG_Y]);
        let mut sink = RecordingSink::new();
        run(&mut tree, DVec3::ZERO, &mut sink, 2);
        assert_eq!(tree.patch(broken).unwrap().state(), PatchState::DividedPending);
        assert_eq!(tree.patch(healthy).unwrap().state(), PatchState::DividedPending);

        tree.arena.get_mut(broken).unwrap().children_built = 9;

        let report = tree.tick(DVec3::ZERO, &mut sink);
        assert_eq!(report.faults.len(), 1);
        match &report.faults[0] {
            LodError::InvariantViolation { patch, .. } => assert_eq!(*patch, broken),
            other => panic!("unexpected fault {other:?}"),
        }
        // The healthy root carried on and scheduled its children.
        assert_eq!(report.builds_scheduled, 4);
        let healthy_children = tree.patch(healthy).unwrap().children().unwrap();
        for child in healthy_children {
            assert_eq!(tree.patch(child).unwrap().state(), PatchState::Building);
        }
        let broken_children = tree.patch(broken).unwrap().children().unwrap();
        for child in broken_children {
            assert_eq!(tree.patch(child).unwrap().state(), PatchState::Unbuilt);
        }
    }

    #[test]
    fn test_child_level_mismatch_reported() {
        let settings = LodSettings {
            subdivide_factor: 100.0,
            ..Default::default()
        };
        let mut tree = tree(2, settings);
        let root = tree.add_root(octant());
        let mut sink = RecordingSink::new();
        run(&mut tree, DVec3::ZERO, &mut sink, 2);

        let child = tree.patch(root).unwrap().children().unwrap()[2];
        tree.arena.get_mut(child).unwrap().level = 5;
        let report = tree.tick(DVec3::ZERO, &mut sink);
        assert_eq!(report.faults.len(), 1);
        assert!(matches!(
            &report.faults[0],
            LodError::InvariantViolation { patch, .. } if *patch == root
        ));
    }

    #[test]
    fn test_fly_in_and_out_keeps_visibility_consistent() {
        let mut tree = tree(3, LodSettings::default());
        tree.add_root(octant());
        let mut sink = RecordingSink::new();
        let center = patch_center(octant(), RADIUS);

        // Descend, hover just above the surface, then climb back out.
        let mut path: Vec<f64> = (0..20).map(|i| 3.0 - f64::from(i) * 0.1).collect();
        path.extend(std::iter::repeat_n(1.05, 20));
        path.extend((0..20).map(|i| 1.1 + f64::from(i) * 0.1));
        let mut deepest = 0;
        for scale in path {
            let camera = center * scale;
            let report = tree.tick(camera, &mut sink);
            assert!(report.faults.is_empty(), "faults: {:?}", report.faults);
            assert_visibility_consistent(&tree, &sink);
            deepest = deepest.max(tree.max_depth());
        }
        assert_eq!(deepest, 3);

        // Back out far enough that everything merged.
        run(&mut tree, center * 10.0, &mut sink, 3);
        assert_eq!(tree.live_patches(), 1);
        assert_eq!(sink.visible_count(), 1);
    }

    #[test]
    fn test_icosahedron_roots() {
        let mut tree = tree(0, LodSettings::default());
        let roots = tree.add_icosahedron_roots();
        assert_eq!(roots.len(), 20);
        assert_eq!(tree.roots(), roots.as_slice());
        let mut sink = RecordingSink::new();
        run(&mut tree, DVec3::new(0.0, 0.0, 10.0 * RADIUS), &mut sink, 2);
        assert_eq!(tree.visible_patches(), 20);
        assert_eq!(
            sink.total_triangles(),
            20 * tree.resolution().triangle_count()
        );
    }

    #[test]
    fn test_threaded_mode_converges() {
        let planet = PlanetConfig::new(RADIUS, 2, 2).unwrap();
        let mut tree = LodTree::new(
            planet,
            NoiseParams::default(),
            LodSettings::default(),
            WorkerMode::Threaded(2),
        )
        .unwrap();
        let roots = tree.add_icosahedron_roots();
        let face = tree.patch(roots[0]).unwrap().corners();
        let camera = patch_center(face, RADIUS) * 1.01;
        let mut sink = RecordingSink::new();

        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            let report = tree.tick(camera, &mut sink);
            assert!(report.faults.is_empty(), "faults: {:?}", report.faults);
            assert_visibility_consistent(&tree, &sink);
            if report.is_idle() && tree.in_flight_builds() == 0 {
                break;
            }
            assert!(Instant::now() < deadline, "tree did not settle");
            std::thread::sleep(Duration::from_millis(2));
        }

        assert_eq!(tree.max_depth(), 2);
        assert!(tree.patches().all(|(_, n)| n.state() != PatchState::DividedPending));
    }
}
