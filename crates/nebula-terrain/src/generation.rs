//! Sampling a patch's height, normal and colour grids from a [`Terrain`].
//!
//! Each patch samples a bordered grid: one extra ring of points outside
//! its own quad so that normals on the patch edge can be computed by
//! central differences without looking at neighbouring patches. The border
//! ring is discarded once normals are known.

use glam::{DVec3, Vec3};
use nebula_cubesphere::quad_point;

use crate::terrain::Terrain;

/// Width of the sampling border ring, in grid steps.
pub const BORDER_SIZE: usize = 1;

/// Sampled surface data for one patch: `edge_len × edge_len` grids in
/// row-major order, `y` along corner 0 → 3 and `x` along corner 0 → 1.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchSamples {
    edge_len: u32,
    /// Heights above the unit sphere, as a fraction of the body radius.
    pub heights: Vec<f64>,
    /// Outward unit surface normals.
    pub normals: Vec<Vec3>,
    /// 8-bit RGB colours.
    pub colors: Vec<[u8; 3]>,
}

impl PatchSamples {
    /// Vertices per patch edge.
    #[must_use]
    pub fn edge_len(&self) -> u32 {
        self.edge_len
    }

    /// Number of samples in each grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    /// Whether the grids are empty. Never true for sampled patches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Row-major index of grid point `(x, y)`.
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.edge_len && y < self.edge_len);
        (y * self.edge_len + x) as usize
    }

    /// Height at grid point `(x, y)`.
    #[must_use]
    pub fn height(&self, x: u32, y: u32) -> f64 {
        self.heights[self.index(x, y)]
    }

    /// Lowest sampled height.
    #[must_use]
    pub fn min_height(&self) -> f64 {
        self.heights.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Highest sampled height.
    #[must_use]
    pub fn max_height(&self) -> f64 {
        self.heights.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Grid parameter of bordered index `i`.
///
/// Index `BORDER_SIZE` maps to exactly 0 and `edge_len` to exactly 1, so
/// patches sharing an edge evaluate the same corner interpolation there.
fn grid_t(i: usize, edge_len: usize) -> f64 {
    (i as f64 - BORDER_SIZE as f64) / (edge_len - 1) as f64
}

/// Sample heights, normals and colours for the quad `corners`.
///
/// # Panics
///
/// Panics if `edge_len < 2`, or if `terrain` returns a height that is not
/// finite or is negative.
pub fn sample_patch(terrain: &dyn Terrain, corners: &[DVec3; 4], edge_len: u32) -> PatchSamples {
    assert!(edge_len >= 2, "edge_len must be at least 2, got {edge_len}");
    let n = edge_len as usize;
    let bordered = n + 2 * BORDER_SIZE;

    let mut directions = Vec::with_capacity(bordered * bordered);
    let mut bordered_heights = Vec::with_capacity(bordered * bordered);
    let mut positions = Vec::with_capacity(bordered * bordered);

    for by in 0..bordered {
        let y = grid_t(by, n);
        for bx in 0..bordered {
            let x = grid_t(bx, n);
            let dir = quad_point(corners, x, y);
            let h = terrain.height(dir);
            assert!(
                h.is_finite() && h >= 0.0,
                "terrain height {h} at {dir:?} must be finite and non-negative"
            );
            directions.push(dir);
            bordered_heights.push(h);
            positions.push(dir * (1.0 + h));
        }
    }

    let mut heights = Vec::with_capacity(n * n);
    let mut normals = Vec::with_capacity(n * n);
    let mut colors = Vec::with_capacity(n * n);

    for y in 0..n {
        for x in 0..n {
            let c = (y + BORDER_SIZE) * bordered + (x + BORDER_SIZE);
            let dx = positions[c + 1] - positions[c - 1];
            let dy = positions[c + bordered] - positions[c - bordered];
            // x runs v0 → v1 and y runs v0 → v3; their cross product points outward.
            let normal = dx.cross(dy).try_normalize().unwrap_or(directions[c]);
            let h = bordered_heights[c];

            heights.push(h);
            normals.push(normal.as_vec3());
            colors.push(to_rgb8(terrain.color(directions[c], h, normal)));
        }
    }

    PatchSamples {
        edge_len,
        heights,
        normals,
        colors,
    }
}

fn to_rgb8(color: DVec3) -> [u8; 3] {
    let c = (color.clamp(DVec3::ZERO, DVec3::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FbmTerrain;
    use nebula_cubesphere::{CubeFace, split_quad};

    struct Flat;

    impl Terrain for Flat {
        fn height(&self, _point: DVec3) -> f64 {
            0.0
        }

        fn color(&self, _point: DVec3, _height: f64, _normal: DVec3) -> DVec3 {
            DVec3::new(1.0, 0.5, 0.0)
        }
    }

    struct Broken;

    impl Terrain for Broken {
        fn height(&self, _point: DVec3) -> f64 {
            f64::NAN
        }

        fn color(&self, _point: DVec3, _height: f64, _normal: DVec3) -> DVec3 {
            DVec3::ZERO
        }
    }

    #[test]
    fn test_grid_t_hits_exact_endpoints() {
        for n in [7_usize, 15, 25, 35, 55] {
            assert_eq!(grid_t(BORDER_SIZE, n), 0.0);
            assert_eq!(grid_t(n, n), 1.0);
            assert!(grid_t(0, n) < 0.0);
            assert!(grid_t(n + 1, n) > 1.0);
        }
    }

    #[test]
    fn test_flat_terrain_normals_point_outward() {
        let corners = CubeFace::PosY.root_corners();
        let samples = sample_patch(&Flat, &corners, 7);
        assert_eq!(samples.len(), 49);
        for y in 0..7 {
            for x in 0..7 {
                let t = (x as f64 / 6.0, y as f64 / 6.0);
                let dir = quad_point(&corners, t.0, t.1).as_vec3();
                let normal = samples.normals[samples.index(x, y)];
                assert!(
                    normal.dot(dir) > 0.98,
                    "normal {normal:?} at ({x}, {y}) is not radial"
                );
            }
        }
        assert!(samples.colors.iter().all(|c| *c == [255, 128, 0]));
    }

    #[test]
    fn test_sampling_is_bit_identical() {
        let terrain = FbmTerrain::new(42, 8_000.0, 6_371_000.0);
        let corners = CubeFace::NegX.root_corners();
        let a = sample_patch(&terrain, &corners, 15);
        let b = sample_patch(&terrain, &corners, 15);
        assert_eq!(a, b);
        assert!(
            a.heights
                .iter()
                .zip(&b.heights)
                .all(|(x, y)| x.to_bits() == y.to_bits())
        );
    }

    #[test]
    fn test_sibling_shared_edges_have_equal_heights() {
        let terrain = FbmTerrain::new(9, 8_000.0, 1_000_000.0);
        let children = split_quad(&CubeFace::PosZ.root_corners());
        let n = 15;
        let s: Vec<_> = children
            .iter()
            .map(|c| sample_patch(&terrain, c, n))
            .collect();

        for i in 0..n {
            // Child 0's right edge is child 1's left edge.
            assert_eq!(s[0].height(n - 1, i).to_bits(), s[1].height(0, i).to_bits());
            // Child 0's top edge is child 3's bottom edge.
            assert_eq!(s[0].height(i, n - 1).to_bits(), s[3].height(i, 0).to_bits());
            // Child 1's top edge is child 2's bottom edge.
            assert_eq!(s[1].height(i, n - 1).to_bits(), s[2].height(i, 0).to_bits());
        }
    }

    #[test]
    fn test_min_max_height() {
        let terrain = FbmTerrain::new(1, 8_000.0, 6_371_000.0);
        let samples = sample_patch(&terrain, &CubeFace::PosX.root_corners(), 25);
        assert!(samples.min_height() >= 0.0);
        assert!(samples.max_height() <= terrain.max_height());
        assert!(samples.min_height() <= samples.max_height());
    }

    #[test]
    #[should_panic(expected = "must be finite and non-negative")]
    fn test_nan_height_is_fatal() {
        let _ = sample_patch(&Broken, &CubeFace::PosX.root_corners(), 7);
    }

    #[test]
    #[should_panic(expected = "edge_len must be at least 2")]
    fn test_degenerate_edge_len_panics() {
        let _ = sample_patch(&Flat, &CubeFace::PosX.root_corners(), 1);
    }
}
