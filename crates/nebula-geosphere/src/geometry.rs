//! Patch vertex layout and the shared, size-keyed index template.
//!
//! Every patch of a given edge length has the same topology: an
//! `edge_len × edge_len` surface grid surrounded by one ring of skirt
//! vertices. The skirt hangs just below the patch's lowest sample so that
//! cracks against coarser neighbours are hidden. Indices for this layout
//! are built once per edge length and shared by all patches.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use nebula_cubesphere::quad_point;
use nebula_terrain::PatchSamples;
use rustc_hash::FxHashMap;

/// Scale applied to `1 + min_height` to place skirt vertices just under
/// the patch's lowest interior sample.
pub const SKIRT_SCALE: f64 = 0.999995;

/// A patch vertex as uploaded to the GPU.
///
/// Positions are relative to the patch's clip centroid in unit-sphere
/// space; the draw transform scales by the body radius and translates
/// relative to the camera.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PatchVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [u8; 4],
    pub uv: [f32; 2],
}

/// Index layout for patches of one edge length.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchGeometryTemplate {
    edge_len: u32,
    indices: Vec<u32>,
}

impl PatchGeometryTemplate {
    /// Build the index layout for `edge_len` surface vertices per side.
    ///
    /// Cells inside the surface grid all share one diagonal. Cells touching
    /// the skirt ring alternate their diagonal, giving the serrated skirt
    /// edge. All triangles wind counter-clockwise seen from outside.
    ///
    /// # Panics
    ///
    /// Panics if `edge_len < 2`.
    pub fn new(edge_len: u32) -> Self {
        assert!(edge_len >= 2, "edge_len must be at least 2, got {edge_len}");
        let grid_len = edge_len + 2;
        let cells = (grid_len - 1) as usize;
        let mut indices = Vec::with_capacity(cells * cells * 6);

        let at = |x: u32, y: u32| y * grid_len + x;
        for y in 0..grid_len - 1 {
            for x in 0..grid_len - 1 {
                let a = at(x, y);
                let b = at(x + 1, y);
                let c = at(x + 1, y + 1);
                let d = at(x, y + 1);
                let skirt_cell = x == 0 || y == 0 || x == grid_len - 2 || y == grid_len - 2;
                if skirt_cell && (x + y) % 2 == 1 {
                    indices.extend_from_slice(&[a, b, d, b, c, d]);
                } else {
                    indices.extend_from_slice(&[a, b, c, a, c, d]);
                }
            }
        }

        Self { edge_len, indices }
    }

    /// Surface vertices per side.
    #[must_use]
    pub fn edge_len(&self) -> u32 {
        self.edge_len
    }

    /// Vertices per side including the skirt ring.
    #[must_use]
    pub fn grid_len(&self) -> u32 {
        self.edge_len + 2
    }

    /// Total vertices per patch.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        let g = self.grid_len() as usize;
        g * g
    }

    /// Triangle list indices.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Indices as raw bytes for buffer creation.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex index of grid position `(gx, gy)`, skirt ring included.
    #[must_use]
    pub fn vertex_index(&self, gx: u32, gy: u32) -> u32 {
        gy * self.grid_len() + gx
    }

    /// Whether grid position `(gx, gy)` is on the skirt ring.
    #[must_use]
    pub fn is_skirt(&self, gx: u32, gy: u32) -> bool {
        let last = self.grid_len() - 1;
        gx == 0 || gy == 0 || gx == last || gy == last
    }

    /// Build the vertices of one patch.
    ///
    /// Returns the vertices and the largest distance of any vertex from
    /// `clip_centroid`, which callers use to grow the bounding sphere.
    ///
    /// # Panics
    ///
    /// Panics if `samples` was sampled at a different edge length.
    pub fn build_vertices(
        &self,
        corners: &[DVec3; 4],
        clip_centroid: DVec3,
        samples: &PatchSamples,
    ) -> (Vec<PatchVertex>, f64) {
        assert_eq!(
            samples.edge_len(),
            self.edge_len,
            "samples edge length does not match template"
        );
        let n = self.edge_len;
        let denom = (n - 1) as f64;
        let skirt_radius = (samples.min_height() + 1.0) * SKIRT_SCALE;

        let mut vertices = Vec::with_capacity(self.vertex_count());
        let mut max_distance: f64 = 0.0;

        for gy in 0..self.grid_len() {
            for gx in 0..self.grid_len() {
                // Skirt vertices copy the nearest surface vertex.
                let sx = gx.clamp(1, n) - 1;
                let sy = gy.clamp(1, n) - 1;
                let (u, v) = (sx as f64 / denom, sy as f64 / denom);
                let dir = quad_point(corners, u, v);
                let i = samples.index(sx, sy);

                let scale = if self.is_skirt(gx, gy) {
                    skirt_radius
                } else {
                    1.0 + samples.heights[i]
                };
                let offset = dir * scale - clip_centroid;
                max_distance = max_distance.max(offset.length());

                let [r, g, b] = samples.colors[i];
                vertices.push(PatchVertex {
                    position: offset.as_vec3().to_array(),
                    normal: samples.normals[i].to_array(),
                    color: [r, g, b, 255],
                    uv: [u as f32, v as f32],
                });
            }
        }

        (vertices, max_distance)
    }
}

/// Templates keyed by edge length.
#[derive(Default)]
pub struct TemplateCache {
    templates: FxHashMap<u32, Arc<PatchGeometryTemplate>>,
}

impl TemplateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared template for `edge_len`, built on first use.
    pub fn get_or_create(&mut self, edge_len: u32) -> Arc<PatchGeometryTemplate> {
        Arc::clone(
            self.templates
                .entry(edge_len)
                .or_insert_with(|| Arc::new(PatchGeometryTemplate::new(edge_len))),
        )
    }

    /// Drop every cached template.
    pub fn clear(&mut self) {
        self.templates.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
