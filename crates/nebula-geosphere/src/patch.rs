//! The patch quadtree: nodes held in an arena, addressed by index.
//!
//! Six root patches cover the cube faces. A patch has either no children
//! or exactly four, created together when its quad-split result arrives.
//! Parents are referenced by index; destroying a subtree frees its slots.
//!
//! A patch asks for more detail by being queued for a quad split during
//! [`PatchTree::lod_update`]; it drops detail by merging its children once
//! no job is pending anywhere beneath it. Visibility only gates new
//! splits: a subtree that leaves the view keeps its detail until distance
//! or depth no longer call for it.

use glam::DVec3;
use nebula_cubesphere::{CubeFace, PatchAddress, quad_clip_centroid, quad_clip_radius};
use nebula_lod::{DistanceQueue, Frustum, HorizonCuller, SplitPolicy};
use nebula_terrain::{ChildPatchData, JobHandle, PatchSamples, QuadSplitResult, SingleSplitResult};
use slab::Slab;

use crate::geometry::{PatchGeometryTemplate, PatchVertex};

/// Index of a patch in its [`PatchTree`].
pub type PatchId = usize;

/// One node of the quadtree.
#[derive(Debug)]
pub struct Patch {
    pub address: PatchAddress,
    /// Unit-sphere corners `v0..v3`.
    pub corners: [DVec3; 4],
    /// Average of the corners; lies inside the sphere.
    pub clip_centroid: DVec3,
    /// `clip_centroid` projected onto the unit sphere.
    pub centroid: DVec3,
    /// Bounding-sphere radius around `clip_centroid`.
    pub clip_radius: f64,
    pub parent: Option<PatchId>,
    pub children: Option<[PatchId; 4]>,
    /// Sampled surface, once the patch's data has arrived.
    pub samples: Option<PatchSamples>,
    /// Vertices waiting to be uploaded to the renderer.
    pub vertices: Option<Vec<PatchVertex>>,
    /// Whether the renderer currently holds this patch's vertices.
    pub uploaded: bool,
    /// A job for this patch is queued or running.
    pub pending: bool,
    /// Handle of the pending job, once dispatched.
    pub job: Option<JobHandle>,
}

impl Patch {
    fn new(address: PatchAddress, corners: [DVec3; 4], parent: Option<PatchId>) -> Self {
        let clip_centroid = quad_clip_centroid(&corners);
        Self {
            address,
            corners,
            clip_centroid,
            centroid: clip_centroid.normalize(),
            clip_radius: quad_clip_radius(&corners, clip_centroid),
            parent,
            children: None,
            samples: None,
            vertices: None,
            uploaded: false,
            pending: false,
            job: None,
        }
    }

    /// Depth in the quadtree; roots are 0.
    #[must_use]
    pub fn depth(&self) -> u8 {
        self.address.depth()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.samples.is_some()
    }

    /// Store sampled data, build vertices and grow the bounding sphere to
    /// enclose them.
    fn receive(&mut self, samples: PatchSamples, template: &PatchGeometryTemplate) {
        let (vertices, extent) = template.build_vertices(&self.corners, self.clip_centroid, &samples);
        self.clip_radius = self.clip_radius.max(extent);
        self.samples = Some(samples);
        self.vertices = Some(vertices);
        self.pending = false;
        self.job = None;
    }

    /// Vertices for upload: the ones built on arrival, or rebuilt from the
    /// samples if they were dropped when the patch split.
    pub(crate) fn take_vertices(&mut self, template: &PatchGeometryTemplate) -> Option<Vec<PatchVertex>> {
        self.vertices.take().or_else(|| {
            let samples = self.samples.as_ref()?;
            Some(template.build_vertices(&self.corners, self.clip_centroid, samples).0)
        })
    }
}

/// Why a result was not applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaleResult {
    /// The chain of patches down to the address no longer exists.
    Missing,
    /// The patch exists but is not waiting on this job.
    NotPending,
}

/// Camera state for one LOD pass, in unit-sphere space except where noted.
pub struct LodView<'a> {
    /// Camera position divided by the body radius.
    pub camera: DVec3,
    /// Frustum in body-local meters.
    pub frustum: &'a Frustum,
    /// Body radius in meters.
    pub radius: f64,
    pub policy: &'a SplitPolicy,
    /// Horizon of the idealized unit sphere.
    pub horizon: &'a HorizonCuller,
}

impl LodView<'_> {
    fn is_visible(&self, patch: &Patch) -> bool {
        if !self
            .frustum
            .test_sphere(patch.clip_centroid * self.radius, patch.clip_radius * self.radius)
        {
            return false;
        }
        let camera_inside = self.camera.distance(patch.clip_centroid) <= patch.clip_radius;
        camera_inside || !self.horizon.is_occluded(patch.clip_centroid, patch.clip_radius)
    }
}

/// Arena-backed quadtree over the six cube faces.
pub struct PatchTree {
    patches: Slab<Patch>,
    roots: [PatchId; 6],
}

impl Default for PatchTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchTree {
    /// A tree holding the six root patches, without data.
    #[must_use]
    pub fn new() -> Self {
        let mut patches = Slab::with_capacity(64);
        let roots = CubeFace::ALL
            .map(|face| patches.insert(Patch::new(PatchAddress::root(face), face.root_corners(), None)));
        Self { patches, roots }
    }

    /// Root patch ids in [`CubeFace::ALL`] order.
    #[must_use]
    pub fn roots(&self) -> [PatchId; 6] {
        self.roots
    }

    #[must_use]
    pub fn get(&self, id: PatchId) -> Option<&Patch> {
        self.patches.get(id)
    }

    pub fn get_mut(&mut self, id: PatchId) -> Option<&mut Patch> {
        self.patches.get_mut(id)
    }

    /// Number of live patches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Never true: the roots always exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Every live patch.
    pub fn iter(&self) -> impl Iterator<Item = (PatchId, &Patch)> {
        self.patches.iter()
    }

    /// Find a patch by descending from its root along the address path.
    #[must_use]
    pub fn find(&self, address: PatchAddress) -> Option<PatchId> {
        let mut id = self.roots[address.face().index() as usize];
        for quadrant in address.path() {
            id = self.patches[id].children?[quadrant as usize];
        }
        Some(id)
    }

    /// Whether the patch and everything beneath it has no pending job.
    #[must_use]
    pub fn can_merge(&self, id: PatchId) -> bool {
        let patch = &self.patches[id];
        !patch.pending
            && patch
                .children
                .is_none_or(|children| children.iter().all(|&c| self.can_merge(c)))
    }

    /// Destroy the children of `id` if nothing beneath it is pending.
    ///
    /// Addresses of destroyed patches that the renderer holds are pushed
    /// to `released`. Returns whether the merge happened.
    pub fn merge(&mut self, id: PatchId, released: &mut Vec<PatchAddress>) -> bool {
        let Some(children) = self.patches[id].children else {
            return false;
        };
        if !children.iter().all(|&c| self.can_merge(c)) {
            return false;
        }
        for child in children {
            self.destroy_subtree(child, released);
        }
        self.patches[id].children = None;
        true
    }

    fn destroy_subtree(&mut self, id: PatchId, released: &mut Vec<PatchAddress>) {
        let patch = self.patches.remove(id);
        if patch.uploaded {
            released.push(patch.address);
        }
        if let Some(children) = patch.children {
            for child in children {
                self.destroy_subtree(child, released);
            }
        }
    }

    /// Walk the subtree under `id`, queueing split requests and merging
    /// subtrees that no longer need their detail.
    ///
    /// A patch needs detail when it may still be refined and is close
    /// enough for its depth (roots skip the distance test). Split patches
    /// that need detail are descended into and the rest are merged. Leaves
    /// that need detail are queued if they are not pending and are
    /// visible; queued patches are marked pending immediately.
    pub fn lod_update(
        &mut self,
        id: PatchId,
        view: &LodView<'_>,
        requests: &mut DistanceQueue<PatchId>,
        released: &mut Vec<PatchAddress>,
    ) {
        let patch = &self.patches[id];
        if !patch.has_data() {
            return;
        }
        let depth = patch.depth();
        let distance = view.camera.distance(patch.centroid);

        let needs_detail =
            view.policy.can_refine(depth) && (depth == 0 || view.policy.exceeds_error(depth, distance));

        let children = patch.children;
        match children {
            Some(children) if needs_detail => {
                for child in children {
                    self.lod_update(child, view, requests, released);
                }
            }
            Some(_) => {
                self.merge(id, released);
            }
            None if needs_detail && !patch.pending && view.is_visible(patch) => {
                self.patches[id].pending = true;
                requests.push(distance, id);
            }
            None => {}
        }
    }

    /// Apply a single-patch result to the patch pending on `handle`.
    pub fn apply_single(
        &mut self,
        handle: JobHandle,
        result: SingleSplitResult,
        template: &PatchGeometryTemplate,
    ) -> Result<PatchId, StaleResult> {
        let id = self.pending_patch(result.address, handle)?;
        self.patches[id].receive(result.samples, template);
        Ok(id)
    }

    /// Create the four children of the patch pending on `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the pending patch already has children.
    pub fn apply_quad(
        &mut self,
        handle: JobHandle,
        result: QuadSplitResult,
        template: &PatchGeometryTemplate,
    ) -> Result<PatchId, StaleResult> {
        let id = self.pending_patch(result.address, handle)?;
        assert!(
            self.patches[id].children.is_none(),
            "patch {} was split while a quad split was pending",
            result.address
        );

        let children = result.children.map(|ChildPatchData { address, corners, samples }| {
            debug_assert_eq!(address.parent(), Some(result.address));
            let mut child = Patch::new(address, corners, Some(id));
            child.receive(samples, template);
            self.patches.insert(child)
        });

        let parent = &mut self.patches[id];
        parent.children = Some(children);
        parent.pending = false;
        parent.job = None;
        // Rebuilt from the samples if the patch is merged before being drawn.
        parent.vertices = None;
        Ok(id)
    }

    fn pending_patch(&self, address: PatchAddress, handle: JobHandle) -> Result<PatchId, StaleResult> {
        let id = self.find(address).ok_or(StaleResult::Missing)?;
        let patch = &self.patches[id];
        if patch.pending && patch.job == Some(handle) {
            Ok(id)
        } else {
            Err(StaleResult::NotPending)
        }
    }

    /// Handles of every dispatched job in the tree.
    pub fn pending_jobs(&self) -> impl Iterator<Item = JobHandle> + '_ {
        self.patches.iter().filter_map(|(_, p)| p.job)
    }

    /// Addresses of every patch the renderer holds.
    pub fn uploaded(&self) -> impl Iterator<Item = PatchAddress> + '_ {
        self.patches
            .iter()
            .filter(|(_, p)| p.uploaded)
            .map(|(_, p)| p.address)
    }
}
