//! Scripted camera flight and a renderer that only counts.

use std::collections::HashSet;

use glam::{DMat4, DVec3, Mat4};
use nebula_config::{Config, FlightConfig};
use nebula_cubesphere::{BodyId, PatchAddress};
use nebula_geosphere::{GeoSphereSettings, PatchGeometryTemplate, PatchRenderer, PatchVertex};
use nebula_lod::{Frustum, edge_length_for_detail};
use tracing::warn;

/// Direction the camera descends along, before normalization.
const FLIGHT_AXIS: DVec3 = DVec3::new(0.3, 0.8, 0.5);

/// Vertical field of view of the flight camera, in radians.
const FOV_Y: f64 = std::f64::consts::FRAC_PI_3;

/// Translate the config sections into sphere settings.
///
/// An out-of-range detail level falls back to level 1.
pub fn settings_from_config(config: &Config) -> GeoSphereSettings {
    let geo = &config.geosphere;
    let edge_len = edge_length_for_detail(geo.detail).unwrap_or_else(|| {
        warn!("Detail level {} is out of range, using 1", geo.detail);
        15
    });
    GeoSphereSettings {
        edge_len,
        subdivide_at_camdist: geo.subdivide_at_camdist,
        global_max_depth: geo.global_max_depth,
        target_triangle_length: geo.target_triangle_length_m,
        max_split_operations: geo.max_split_operations,
    }
}

/// Camera altitude at `tick`, falling geometrically from the start
/// altitude to the end altitude over the configured number of ticks.
#[must_use]
pub fn altitude_at(flight: &FlightConfig, tick: u32) -> f64 {
    let start = flight.start_altitude_m.max(1.0);
    let end = flight.end_altitude_m.max(1.0);
    if flight.ticks <= 1 {
        return end;
    }
    let t = f64::from(tick.min(flight.ticks - 1)) / f64::from(flight.ticks - 1);
    start * (end / start).powf(t)
}

/// Camera position and frustum looking straight down at the body center
/// from `altitude` meters above a body of `radius` meters.
#[must_use]
pub fn camera_at(radius: f64, altitude: f64) -> (DVec3, Frustum) {
    let axis = FLIGHT_AXIS.normalize();
    let position = axis * (radius + altitude);
    let up = axis.cross(DVec3::Z).try_normalize().unwrap_or(DVec3::X);
    let view = DMat4::look_at_rh(position, DVec3::ZERO, up);
    let near = (altitude * 0.01).max(0.1);
    let far = radius + altitude + radius;
    let proj = DMat4::perspective_rh(FOV_Y, 16.0 / 9.0, near, far);
    (position, Frustum::from_view_projection(&(proj * view)))
}

/// Renderer that keeps counts instead of GPU buffers.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    resident: HashSet<(BodyId, PatchAddress)>,
    pub uploads: usize,
    pub releases: usize,
    pub draws_this_frame: usize,
    pub uploaded_bytes: usize,
}

impl CountingRenderer {
    /// Patches currently holding a buffer.
    #[must_use]
    pub fn resident(&self) -> usize {
        self.resident.len()
    }

    /// Reset per-frame counters.
    pub fn begin_frame(&mut self) {
        self.draws_this_frame = 0;
    }
}

impl PatchRenderer for CountingRenderer {
    fn upload_patch(
        &mut self,
        body: BodyId,
        address: PatchAddress,
        vertices: &[PatchVertex],
        template: &PatchGeometryTemplate,
    ) {
        self.resident.insert((body, address));
        self.uploads += 1;
        self.uploaded_bytes += std::mem::size_of_val(vertices) + template.index_bytes().len();
    }

    fn draw_patch(&mut self, _body: BodyId, _address: PatchAddress, _transform: Mat4) {
        self.draws_this_frame += 1;
    }

    fn release_patch(&mut self, body: BodyId, address: PatchAddress) {
        if self.resident.remove(&(body, address)) {
            self.releases += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[test]
    fn test_altitude_endpoints() {
        let flight = FlightConfig {
            start_altitude_m: 1_000_000.0,
            end_altitude_m: 100.0,
            ticks: 11,
        };
        assert!((altitude_at(&flight, 0) - 1_000_000.0).abs() < 1e-6);
        assert!((altitude_at(&flight, 10) - 100.0).abs() < 1e-9);
        assert!((altitude_at(&flight, 5) - 10_000.0).abs() < 1e-6, "midpoint is geometric");
        assert!((altitude_at(&flight, 99) - 100.0).abs() < 1e-9, "clamped past the end");
    }

    #[test]
    fn test_single_tick_flight_sits_at_end() {
        let flight = FlightConfig {
            ticks: 1,
            ..Default::default()
        };
        assert_eq!(altitude_at(&flight, 0), flight.end_altitude_m);
    }

    #[test]
    fn test_camera_sees_surface_below() {
        let radius = 6_371_000.0;
        let (position, frustum) = camera_at(radius, 10_000.0);
        assert!((position.length() - (radius + 10_000.0)).abs() < 1e-6);
        let below = position.normalize() * radius;
        assert!(frustum.contains_point(below), "surface under the camera must be visible");
        assert!(!frustum.contains_point(position * 2.0), "space behind the camera is culled");
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = Config::default();
        config.geosphere.detail = 3;
        config.geosphere.max_split_operations = 16;
        let settings = settings_from_config(&config);
        assert_eq!(settings.edge_len, 35);
        assert_eq!(settings.max_split_operations, 16);

        config.geosphere.detail = 9;
        assert_eq!(settings_from_config(&config).edge_len, 15);
    }

    #[test]
    fn test_counting_renderer_tracks_residency() {
        let mut renderer = CountingRenderer::default();
        let template = PatchGeometryTemplate::new(7);
        let vertices = vec![PatchVertex::zeroed(); template.vertex_count()];
        let address = PatchAddress::root(nebula_cubesphere::CubeFace::PosY);
        renderer.upload_patch(BodyId(1), address, &vertices, &template);
        assert_eq!(renderer.resident(), 1);
        renderer.release_patch(BodyId(1), address);
        renderer.release_patch(BodyId(1), address);
        assert_eq!(renderer.resident(), 0);
        assert_eq!(renderer.releases, 1, "double release must not count twice");
    }
}
