//! Owner of every geosphere in the simulation and the job queue they share.
//!
//! The registry is held by the main loop and passed explicitly to whatever
//! needs it. Finished jobs are drained once per [`update`](GeoSphereRegistry::update)
//! and routed to their sphere by [`BodyId`].

use std::sync::Arc;

use glam::DVec3;
use nebula_cubesphere::{BodyDef, BodyId};
use nebula_lod::{Frustum, edge_length_for_detail};
use nebula_terrain::{AsyncJobQueue, SampleJob, Terrain};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::error::GeoSphereError;
use crate::geometry::{PatchGeometryTemplate, TemplateCache};
use crate::render::PatchRenderer;
use crate::sphere::{GeoSphere, GeoSphereSettings, SphereStats};

/// Every registered sphere plus the shared job queue and templates.
pub struct GeoSphereRegistry {
    spheres: FxHashMap<BodyId, GeoSphere>,
    jobs: AsyncJobQueue<SampleJob>,
    templates: TemplateCache,
    settings: GeoSphereSettings,
}

impl GeoSphereRegistry {
    /// Create an empty registry running jobs on `jobs`.
    pub fn new(settings: GeoSphereSettings, jobs: AsyncJobQueue<SampleJob>) -> Self {
        Self {
            spheres: FxHashMap::default(),
            jobs,
            templates: TemplateCache::new(),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GeoSphereSettings {
        &self.settings
    }

    #[must_use]
    pub fn jobs(&self) -> &AsyncJobQueue<SampleJob> {
        &self.jobs
    }

    fn template(&mut self) -> Arc<PatchGeometryTemplate> {
        self.templates.get_or_create(self.settings.edge_len)
    }

    /// Register a sphere for `body`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoSphereError::DuplicateBody`] if the body already has one.
    pub fn add(&mut self, body: BodyDef, terrain: Arc<dyn Terrain>) -> Result<(), GeoSphereError> {
        if self.spheres.contains_key(&body.id) {
            return Err(GeoSphereError::DuplicateBody(body.id));
        }
        let template = self.template();
        let id = body.id;
        let sphere = GeoSphere::new(body, terrain, self.settings.clone(), template);
        self.spheres.insert(id, sphere);
        Ok(())
    }

    /// Unregister a body, cancelling its jobs.
    ///
    /// # Errors
    ///
    /// Returns [`GeoSphereError::UnknownBody`] if the body is not registered.
    pub fn remove(&mut self, id: BodyId) -> Result<GeoSphere, GeoSphereError> {
        let mut sphere = self.spheres.remove(&id).ok_or(GeoSphereError::UnknownBody(id))?;
        sphere.reset(&self.jobs);
        Ok(sphere)
    }

    #[must_use]
    pub fn get(&self, id: BodyId) -> Option<&GeoSphere> {
        self.spheres.get(&id)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut GeoSphere> {
        self.spheres.get_mut(&id)
    }

    /// Number of registered spheres.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Registered body ids, in ascending order.
    #[must_use]
    pub fn bodies(&self) -> Vec<BodyId> {
        let mut ids: Vec<_> = self.spheres.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Cache a body's camera for its next update. Body-local meters.
    ///
    /// # Errors
    ///
    /// Returns [`GeoSphereError::UnknownBody`] if the body is not registered.
    pub fn set_camera(&mut self, id: BodyId, position: DVec3, frustum: Frustum) -> Result<(), GeoSphereError> {
        self.spheres
            .get_mut(&id)
            .ok_or(GeoSphereError::UnknownBody(id))?
            .set_camera(position, frustum);
        Ok(())
    }

    /// Route finished jobs to their spheres, then tick every sphere.
    ///
    /// Results for unregistered bodies are dropped. Returns the errors of
    /// results that could not be queued.
    pub fn update(&mut self) -> Vec<GeoSphereError> {
        let mut errors = Vec::new();
        for job in self.jobs.drain_completed() {
            let body = job.output.body();
            match self.spheres.get_mut(&body) {
                Some(sphere) => {
                    if let Err(e) = sphere.push_result(job.handle, job.output) {
                        errors.push(e);
                    }
                }
                None => debug!("Dropping result for unregistered {body}"),
            }
        }
        for sphere in self.spheres.values_mut() {
            sphere.update(&self.jobs);
        }
        errors
    }

    /// Draw one body.
    ///
    /// # Errors
    ///
    /// Returns [`GeoSphereError::UnknownBody`] if the body is not registered.
    pub fn render(&mut self, id: BodyId, renderer: &mut dyn PatchRenderer) -> Result<(), GeoSphereError> {
        self.spheres
            .get_mut(&id)
            .ok_or(GeoSphereError::UnknownBody(id))?
            .render(renderer);
        Ok(())
    }

    /// Diagnostic counts for one body.
    #[must_use]
    pub fn stats(&self, id: BodyId) -> Option<SphereStats> {
        self.spheres.get(&id).map(GeoSphere::stats)
    }

    /// Change the patch edge length of every sphere.
    ///
    /// Cached templates are discarded and every sphere restarts from its
    /// roots at the new resolution.
    ///
    /// # Errors
    ///
    /// Returns [`GeoSphereError::InvalidDetailLevel`] if `level` is not 0..=4.
    pub fn set_detail(&mut self, level: u8) -> Result<(), GeoSphereError> {
        let edge_len = edge_length_for_detail(level).ok_or(GeoSphereError::InvalidDetailLevel(level))?;
        self.settings.edge_len = edge_len;
        self.templates.clear();
        let template = self.template();
        for sphere in self.spheres.values_mut() {
            sphere.set_template(Arc::clone(&template), &self.jobs);
        }
        info!("Detail level set to {level} ({edge_len} vertices per edge)");
        Ok(())
    }
}
