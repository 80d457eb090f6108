//! One body's geosphere: its patch tree, result queues and the per-tick
//! update that drives them.
//!
//! A sphere starts by requesting its six root patches and is only drawn
//! once all six have arrived. After that, every tick applies the results
//! that came back, runs a LOD pass over the tree with the last camera it
//! was given, and dispatches the resulting split requests nearest-first.

use std::collections::VecDeque;
use std::sync::Arc;

use glam::DVec3;
use nebula_cubesphere::{BodyDef, BodyId, PatchAddress};
use nebula_lod::{DistanceQueue, Frustum, HorizonCuller, SplitPolicy, body_max_depth};
use nebula_terrain::{
    AsyncJobQueue, JobHandle, QuadSplitRequest, QuadSplitResult, SampleJob, SampleOutcome,
    SingleSplitRequest, SingleSplitResult, Terrain,
};
use tracing::{debug, info, warn};

use crate::error::GeoSphereError;
use crate::geometry::PatchGeometryTemplate;
use crate::patch::{LodView, PatchId, PatchTree};
use crate::render::{PatchRenderer, patch_transform};

/// Initialization stage of a sphere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum InitStage {
    /// Root patches exist but have not all been requested.
    BuildFirstPatches,
    /// Waiting for all six roots to arrive.
    RequestedFirstPatches,
    /// All roots have data; steady updates start next tick.
    ReceivedFirstPatches,
    SteadyState,
}

/// Tunables shared by every sphere.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoSphereSettings {
    /// Surface vertices per patch edge.
    pub edge_len: u32,
    /// Camera distance, in body radii, at which a depth-0 patch wants detail.
    pub subdivide_at_camdist: f64,
    /// Deepest level any body may reach.
    pub global_max_depth: u8,
    /// Desired on-ground triangle edge length at full detail, in meters.
    pub target_triangle_length: f64,
    /// Most split jobs a sphere may have outstanding at once. Also the
    /// capacity of each result queue.
    pub max_split_operations: usize,
}

impl Default for GeoSphereSettings {
    fn default() -> Self {
        Self {
            edge_len: 15,
            subdivide_at_camdist: 5.0,
            global_max_depth: 20,
            target_triangle_length: 100.0,
            max_split_operations: 128,
        }
    }
}

/// Diagnostic counts for one sphere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SphereStats {
    pub patches: usize,
    pub leaves: usize,
    pub pending: usize,
    pub max_depth_reached: u8,
    pub queued_results: usize,
}

/// The geosphere of one body.
pub struct GeoSphere {
    body: BodyDef,
    terrain: Arc<dyn Terrain>,
    settings: GeoSphereSettings,
    policy: SplitPolicy,
    template: Arc<PatchGeometryTemplate>,
    tree: PatchTree,
    stage: InitStage,
    quad_results: VecDeque<(JobHandle, QuadSplitResult)>,
    single_results: VecDeque<(JobHandle, SingleSplitResult)>,
    /// Last camera position, body-local meters.
    camera: DVec3,
    /// Last frustum, body-local meters.
    frustum: Frustum,
    /// Jobs submitted whose results have not come back.
    outstanding: usize,
    /// Uploaded patches destroyed since the last render.
    released: Vec<PatchAddress>,
}

impl GeoSphere {
    /// Create a sphere for `body`. Nothing is requested until the first
    /// [`update`](Self::update).
    ///
    /// # Panics
    ///
    /// Panics if `template` does not match `settings.edge_len`.
    pub fn new(
        body: BodyDef,
        terrain: Arc<dyn Terrain>,
        settings: GeoSphereSettings,
        template: Arc<PatchGeometryTemplate>,
    ) -> Self {
        assert_eq!(
            template.edge_len(),
            settings.edge_len,
            "template edge length does not match settings"
        );
        let policy = split_policy(&body, &settings);
        info!(
            "GeoSphere for {} ({}): radius {:.0} m, depth limit {}",
            body.name,
            body.id,
            body.radius,
            policy.depth_limit()
        );
        Self {
            body,
            terrain,
            settings,
            policy,
            template,
            tree: PatchTree::new(),
            stage: InitStage::BuildFirstPatches,
            quad_results: VecDeque::new(),
            single_results: VecDeque::new(),
            camera: DVec3::ZERO,
            frustum: Frustum::unbounded(),
            outstanding: 0,
            released: Vec::new(),
        }
    }

    #[must_use]
    pub fn body(&self) -> &BodyDef {
        &self.body
    }

    #[must_use]
    pub fn id(&self) -> BodyId {
        self.body.id
    }

    #[must_use]
    pub fn stage(&self) -> InitStage {
        self.stage
    }

    #[must_use]
    pub fn settings(&self) -> &GeoSphereSettings {
        &self.settings
    }

    #[must_use]
    pub fn tree(&self) -> &PatchTree {
        &self.tree
    }

    #[must_use]
    pub fn split_policy(&self) -> &SplitPolicy {
        &self.policy
    }

    /// Jobs submitted whose results have not come back.
    #[must_use]
    pub fn outstanding_jobs(&self) -> usize {
        self.outstanding
    }

    /// Cache the camera for the next update. Both are in body-local meters.
    pub fn set_camera(&mut self, position: DVec3, frustum: Frustum) {
        self.camera = position;
        self.frustum = frustum;
    }

    /// Last camera position, body-local meters.
    #[must_use]
    pub fn camera(&self) -> DVec3 {
        self.camera
    }

    /// Queue a finished job's output for the next update.
    ///
    /// # Errors
    ///
    /// Returns [`GeoSphereError::ResultQueueFull`] if the matching queue is
    /// at capacity. The result is dropped and its patch stops waiting, so a
    /// later LOD pass requests it again.
    pub fn push_result(&mut self, handle: JobHandle, outcome: SampleOutcome) -> Result<(), GeoSphereError> {
        self.outstanding = self.outstanding.saturating_sub(1);
        let capacity = self.settings.max_split_operations;
        let full = match &outcome {
            SampleOutcome::Quad(_) => self.quad_results.len() >= capacity,
            SampleOutcome::Single(_) => self.single_results.len() >= capacity,
        };
        if full {
            warn!(
                "{}: result queue full ({capacity}); dropping result for {}",
                self.body.id,
                outcome.address()
            );
            if let Some(patch) = self
                .tree
                .find(outcome.address())
                .and_then(|id| self.tree.get_mut(id))
                && patch.job == Some(handle)
            {
                patch.pending = false;
                patch.job = None;
            }
            return Err(GeoSphereError::ResultQueueFull {
                body: self.body.id,
                capacity,
            });
        }
        match outcome {
            SampleOutcome::Quad(r) => self.quad_results.push_back((handle, r)),
            SampleOutcome::Single(r) => self.single_results.push_back((handle, r)),
        }
        Ok(())
    }

    /// Advance the sphere by one tick.
    pub fn update(&mut self, jobs: &AsyncJobQueue<SampleJob>) {
        match self.stage {
            InitStage::BuildFirstPatches => {
                self.apply_results();
                self.request_roots(jobs);
                if self.roots_requested() {
                    self.stage = InitStage::RequestedFirstPatches;
                    info!("{}: requested first patches", self.body.id);
                }
            }
            InitStage::RequestedFirstPatches => {
                self.apply_results();
                self.request_roots(jobs);
                let roots = self.tree.roots();
                if roots.iter().all(|&id| self.tree.get(id).is_some_and(|p| p.has_data())) {
                    self.stage = InitStage::ReceivedFirstPatches;
                    info!("{}: received first patches", self.body.id);
                }
            }
            InitStage::ReceivedFirstPatches => {
                self.stage = InitStage::SteadyState;
                info!("{}: steady state", self.body.id);
            }
            InitStage::SteadyState => {
                self.apply_results();
                let requests = self.lod_pass();
                self.dispatch(requests, jobs);
            }
        }
    }

    /// Submit a single-patch request for every root that has neither data
    /// nor a job, within the outstanding-job budget.
    fn request_roots(&mut self, jobs: &AsyncJobQueue<SampleJob>) {
        for id in self.tree.roots() {
            if self.outstanding >= self.settings.max_split_operations {
                break;
            }
            let Some(patch) = self.tree.get_mut(id) else {
                continue;
            };
            if patch.has_data() || patch.pending {
                continue;
            }
            let request = SingleSplitRequest {
                body: self.body.id,
                address: patch.address,
                corners: patch.corners,
                edge_len: self.settings.edge_len,
                terrain: Arc::clone(&self.terrain),
            };
            match jobs.submit(SampleJob::Single(request)) {
                Ok(handle) => {
                    patch.pending = true;
                    patch.job = Some(handle);
                    self.outstanding += 1;
                }
                Err(_) => {
                    debug!("{}: job queue full, root {} retries next tick", self.body.id, patch.address);
                }
            }
        }
    }

    fn roots_requested(&self) -> bool {
        self.tree
            .roots()
            .iter()
            .all(|&id| self.tree.get(id).is_some_and(|p| p.pending || p.has_data()))
    }

    /// Apply every queued result, oldest first. Stale results are dropped.
    fn apply_results(&mut self) {
        while let Some((handle, result)) = self.single_results.pop_front() {
            let address = result.address;
            if let Err(reason) = self.tree.apply_single(handle, result, &self.template) {
                debug!("{}: cancelled single result for {address}: {reason:?}", self.body.id);
            }
        }
        while let Some((handle, result)) = self.quad_results.pop_front() {
            let address = result.address;
            if let Err(reason) = self.tree.apply_quad(handle, result, &self.template) {
                debug!("{}: cancelled quad result for {address}: {reason:?}", self.body.id);
            }
        }
    }

    fn lod_pass(&mut self) -> DistanceQueue<PatchId> {
        let camera = self.camera / self.body.radius;
        let horizon = HorizonCuller::new(camera, DVec3::ZERO, 1.0);
        let view = LodView {
            camera,
            frustum: &self.frustum,
            radius: self.body.radius,
            policy: &self.policy,
            horizon: &horizon,
        };
        let mut requests = DistanceQueue::new();
        for root in self.tree.roots() {
            self.tree.lod_update(root, &view, &mut requests, &mut self.released);
        }
        requests
    }

    /// Submit split requests nearest-first within the outstanding-job
    /// budget. Patches that miss out clear their pending flag and are
    /// queued again by a later LOD pass.
    fn dispatch(&mut self, mut requests: DistanceQueue<PatchId>, jobs: &AsyncJobQueue<SampleJob>) {
        let mut budget = self
            .settings
            .max_split_operations
            .saturating_sub(self.outstanding);
        let mut deferred = 0;

        for (_, id) in requests.drain_nearest() {
            let Some(patch) = self.tree.get_mut(id) else {
                continue;
            };
            if budget == 0 {
                patch.pending = false;
                deferred += 1;
                continue;
            }
            let request = QuadSplitRequest {
                body: self.body.id,
                address: patch.address,
                corners: patch.corners,
                edge_len: self.settings.edge_len,
                terrain: Arc::clone(&self.terrain),
            };
            match jobs.submit(SampleJob::Quad(request)) {
                Ok(handle) => {
                    patch.job = Some(handle);
                    self.outstanding += 1;
                    budget -= 1;
                }
                Err(_) => {
                    patch.pending = false;
                    deferred += 1;
                }
            }
        }

        if deferred > 0 {
            debug!("{}: deferred {deferred} split requests", self.body.id);
        }
    }

    /// Upload and draw every visible leaf.
    ///
    /// Releases for destroyed patches are sent first. Nothing is drawn
    /// until all six roots have data.
    pub fn render(&mut self, renderer: &mut dyn PatchRenderer) {
        let body = self.body.id;
        for address in self.released.drain(..) {
            renderer.release_patch(body, address);
        }
        if self.stage < InitStage::ReceivedFirstPatches {
            return;
        }
        let camera = self.camera / self.body.radius;
        for root in self.tree.roots() {
            self.render_patch(root, camera, renderer);
        }
    }

    fn render_patch(&mut self, id: PatchId, camera: DVec3, renderer: &mut dyn PatchRenderer) {
        let radius = self.body.radius;
        let Some(patch) = self.tree.get_mut(id) else {
            return;
        };
        if let Some(children) = patch.children {
            for child in children {
                self.render_patch(child, camera, renderer);
            }
            return;
        }
        if !patch.has_data()
            || !self
                .frustum
                .test_sphere(patch.clip_centroid * radius, patch.clip_radius * radius)
        {
            return;
        }
        if !patch.uploaded
            && let Some(vertices) = patch.take_vertices(&self.template)
        {
            renderer.upload_patch(self.body.id, patch.address, &vertices, &self.template);
            patch.uploaded = true;
        }
        if patch.uploaded {
            let transform = patch_transform(patch.clip_centroid, camera, radius);
            renderer.draw_patch(self.body.id, patch.address, transform);
        }
    }

    /// Throw the tree away and start again from the roots.
    ///
    /// Every outstanding job is cancelled, both result queues are emptied
    /// and every uploaded patch is released on the next render.
    pub fn reset(&mut self, jobs: &AsyncJobQueue<SampleJob>) {
        for handle in self.tree.pending_jobs() {
            jobs.cancel(handle);
        }
        self.released.extend(self.tree.uploaded());
        self.tree = PatchTree::new();
        self.quad_results.clear();
        self.single_results.clear();
        self.outstanding = 0;
        self.stage = InitStage::BuildFirstPatches;
        debug!("{}: reset", self.body.id);
    }

    /// Switch to a template of a different edge length and reset.
    pub fn set_template(&mut self, template: Arc<PatchGeometryTemplate>, jobs: &AsyncJobQueue<SampleJob>) {
        self.settings.edge_len = template.edge_len();
        self.policy = split_policy(&self.body, &self.settings);
        self.template = template;
        self.reset(jobs);
    }

    /// Current counts for diagnostics.
    #[must_use]
    pub fn stats(&self) -> SphereStats {
        let mut stats = SphereStats {
            queued_results: self.quad_results.len() + self.single_results.len(),
            ..Default::default()
        };
        for (_, patch) in self.tree.iter() {
            stats.patches += 1;
            if patch.is_leaf() {
                stats.leaves += 1;
            }
            if patch.pending {
                stats.pending += 1;
            }
            stats.max_depth_reached = stats.max_depth_reached.max(patch.depth());
        }
        stats
    }
}

fn split_policy(body: &BodyDef, settings: &GeoSphereSettings) -> SplitPolicy {
    let ceiling = settings.global_max_depth.min(PatchAddress::MAX_DEPTH);
    let body_max = body_max_depth(
        body.circumference(),
        settings.edge_len,
        settings.target_triangle_length,
        ceiling,
    );
    SplitPolicy::new(settings.subdivide_at_camdist, ceiling, body_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PatchVertex;
    use glam::Mat4;
    use nebula_terrain::FbmTerrain;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder {
        uploads: Vec<PatchAddress>,
        draws: Vec<PatchAddress>,
        releases: Vec<PatchAddress>,
    }

    impl PatchRenderer for Recorder {
        fn upload_patch(
            &mut self,
            _body: BodyId,
            address: PatchAddress,
            vertices: &[PatchVertex],
            template: &PatchGeometryTemplate,
        ) {
            assert_eq!(vertices.len(), template.vertex_count(), "{address} uploaded short");
            self.uploads.push(address);
        }

        fn draw_patch(&mut self, _body: BodyId, address: PatchAddress, _transform: Mat4) {
            self.draws.push(address);
        }

        fn release_patch(&mut self, _body: BodyId, address: PatchAddress) {
            self.releases.push(address);
        }
    }

    fn unit_sphere(settings: GeoSphereSettings) -> GeoSphere {
        let template = Arc::new(PatchGeometryTemplate::new(settings.edge_len));
        let body = BodyDef::new(BodyId(1), "unit", 1.0, 7);
        GeoSphere::new(
            body,
            Arc::new(FbmTerrain::new(7, 0.001, 1.0)),
            settings,
            template,
        )
    }

    fn small_settings() -> GeoSphereSettings {
        GeoSphereSettings {
            edge_len: 7,
            target_triangle_length: 0.001,
            ..Default::default()
        }
    }

    /// Pump jobs into the sphere until `done` holds.
    fn pump(
        sphere: &mut GeoSphere,
        jobs: &AsyncJobQueue<SampleJob>,
        mut done: impl FnMut(&GeoSphere) -> bool,
    ) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while !done(sphere) {
            assert!(Instant::now() < deadline, "sphere did not settle: {:?}", sphere.stats());
            for job in jobs.drain_completed() {
                sphere
                    .push_result(job.handle, job.output)
                    .expect("queue has room");
            }
            sphere.update(jobs);
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_initialization_stages_in_order() {
        let jobs = AsyncJobQueue::new(2, 64, 64);
        let mut sphere = unit_sphere(small_settings());
        assert_eq!(sphere.stage(), InitStage::BuildFirstPatches);

        sphere.update(&jobs);
        assert_eq!(sphere.stage(), InitStage::RequestedFirstPatches);
        assert_eq!(sphere.outstanding_jobs(), 6);
        assert_eq!(sphere.stats().pending, 6);

        pump(&mut sphere, &jobs, |s| s.stage() == InitStage::ReceivedFirstPatches);
        assert_eq!(sphere.outstanding_jobs(), 0);
        sphere.update(&jobs);
        assert_eq!(sphere.stage(), InitStage::SteadyState);
    }

    #[test]
    fn test_nothing_drawn_before_roots_arrive() {
        let jobs = AsyncJobQueue::<SampleJob>::new(0, 64, 64);
        let mut sphere = unit_sphere(small_settings());
        sphere.update(&jobs);
        let mut recorder = Recorder::default();
        sphere.render(&mut recorder);
        assert!(recorder.uploads.is_empty() && recorder.draws.is_empty());
    }

    #[test]
    fn test_full_job_queue_keeps_roots_unrequested() {
        let jobs = AsyncJobQueue::<SampleJob>::new(0, 4, 4);
        let mut sphere = unit_sphere(small_settings());
        sphere.update(&jobs);
        assert_eq!(sphere.stage(), InitStage::BuildFirstPatches);
        assert_eq!(sphere.outstanding_jobs(), 4);
        assert_eq!(sphere.stats().pending, 4);
    }

    #[test]
    fn test_steady_state_refines_towards_camera() {
        let jobs = AsyncJobQueue::new(2, 256, 256);
        let mut sphere = unit_sphere(small_settings());
        sphere.set_camera(DVec3::new(0.0, 1.05, 0.0), Frustum::unbounded());
        pump(&mut sphere, &jobs, |s| s.stage() == InitStage::SteadyState);
        pump(&mut sphere, &jobs, |s| s.stats().max_depth_reached >= 4);

        let mut recorder = Recorder::default();
        sphere.render(&mut recorder);
        assert!(!recorder.draws.is_empty());
        assert_eq!(recorder.uploads.len(), recorder.draws.len());
        assert!(
            recorder.draws.iter().all(|a| sphere.tree().find(*a).is_some()),
            "only live patches are drawn"
        );

        // Second frame draws without re-uploading.
        let mut second = Recorder::default();
        sphere.render(&mut second);
        assert!(second.uploads.is_empty());
        assert_eq!(second.draws.len(), recorder.draws.len());
    }

    #[test]
    fn test_merged_parent_drawn_after_split_before_upload() {
        let jobs = AsyncJobQueue::new(2, 256, 256);
        let mut sphere = unit_sphere(small_settings());
        sphere.set_camera(DVec3::new(0.0, 1.05, 0.0), Frustum::unbounded());
        pump(&mut sphere, &jobs, |s| s.stats().max_depth_reached >= 3);

        // Nothing was drawn during the descent; pulling back merges parents
        // whose vertices were dropped when they split.
        sphere.set_camera(DVec3::new(0.0, 40.0, 0.0), Frustum::unbounded());
        pump(&mut sphere, &jobs, |s| {
            let stats = s.stats();
            stats.pending == 0 && stats.max_depth_reached <= 1
        });

        let mut recorder = Recorder::default();
        sphere.render(&mut recorder);
        assert!(!recorder.draws.is_empty());
        assert_eq!(recorder.uploads, recorder.draws, "every visible leaf uploads once");
        let drawn_leaves = sphere
            .tree()
            .iter()
            .filter(|(_, p)| p.is_leaf() && p.uploaded)
            .count();
        assert_eq!(drawn_leaves, recorder.draws.len());
    }

    #[test]
    fn test_dispatch_respects_outstanding_budget() {
        let jobs = AsyncJobQueue::new(1, 256, 256);
        let mut sphere = unit_sphere(GeoSphereSettings {
            max_split_operations: 8,
            ..small_settings()
        });
        sphere.set_camera(DVec3::new(0.0, 3.0, 0.0), Frustum::unbounded());
        pump(&mut sphere, &jobs, |s| s.stage() == InitStage::SteadyState);

        sphere.update(&jobs);
        assert!(sphere.outstanding_jobs() <= 8);
        assert_eq!(sphere.stats().pending, sphere.outstanding_jobs());
    }

    #[test]
    fn test_result_queue_overflow_is_reported() {
        let mut sphere = unit_sphere(GeoSphereSettings {
            max_split_operations: 1,
            ..small_settings()
        });
        let face = nebula_cubesphere::CubeFace::PosX;
        let outcome = || {
            SampleOutcome::Single(
                SingleSplitRequest {
                    body: BodyId(1),
                    address: PatchAddress::root(face),
                    corners: face.root_corners(),
                    edge_len: 7,
                    terrain: Arc::new(FbmTerrain::new(7, 0.001, 1.0)),
                }
                .generate(),
            )
        };
        assert!(sphere.push_result(JobHandle::from_raw(1), outcome()).is_ok());
        assert_eq!(
            sphere.push_result(JobHandle::from_raw(2), outcome()),
            Err(GeoSphereError::ResultQueueFull {
                body: BodyId(1),
                capacity: 1
            })
        );
        assert_eq!(sphere.stats().queued_results, 1);
    }

    #[test]
    fn test_roots_requested_within_budget() {
        let jobs = AsyncJobQueue::new(1, 64, 64);
        let mut sphere = unit_sphere(GeoSphereSettings {
            max_split_operations: 2,
            ..small_settings()
        });
        sphere.update(&jobs);
        assert_eq!(sphere.outstanding_jobs(), 2);
        assert_eq!(sphere.stage(), InitStage::BuildFirstPatches);
        pump(&mut sphere, &jobs, |s| s.stage() == InitStage::SteadyState);
        assert_eq!(sphere.stats().leaves, 6);
    }

    #[test]
    fn test_reset_cancels_jobs_and_releases_uploads() {
        let jobs = AsyncJobQueue::new(2, 256, 256);
        let mut sphere = unit_sphere(small_settings());
        sphere.set_camera(DVec3::new(0.0, 0.0, 1.2), Frustum::unbounded());
        pump(&mut sphere, &jobs, |s| s.stats().max_depth_reached >= 2);

        let mut recorder = Recorder::default();
        sphere.render(&mut recorder);
        let uploaded = recorder.uploads.len();
        assert!(uploaded > 0);

        sphere.update(&jobs);
        let pending: Vec<_> = sphere.tree().pending_jobs().collect();
        sphere.reset(&jobs);
        assert!(pending.iter().all(|h| !jobs.is_pending(*h)));
        assert_eq!(sphere.stage(), InitStage::BuildFirstPatches);
        assert_eq!(sphere.stats().patches, 6);
        assert_eq!(sphere.outstanding_jobs(), 0);

        let mut after = Recorder::default();
        sphere.render(&mut after);
        assert_eq!(after.releases.len(), uploaded);
        assert!(after.draws.is_empty());
    }

    #[test]
    fn test_split_policy_respects_address_ceiling() {
        let sphere = unit_sphere(GeoSphereSettings {
            global_max_depth: 60,
            target_triangle_length: 1e-12,
            ..small_settings()
        });
        assert_eq!(sphere.split_policy().depth_limit(), PatchAddress::MAX_DEPTH);
    }
}
