//! Quadrilateral patches on the unit sphere: interpolation and subdivision.
//!
//! A patch is described by four unit vectors `v0..v3` going around its
//! boundary. Grid coordinate `x` runs from `v0` to `v1`, `y` runs from `v0`
//! to `v3`, and `v2` sits at `(1, 1)`.

use glam::DVec3;

/// Unit-sphere point at grid position `(x, y)` of the patch.
///
/// Coordinates outside `[0, 1]` extrapolate past the patch edge, which is
/// how border samples are placed. Endpoints are exact: `x == 0.0` and
/// `x == 1.0` reproduce the corner vectors bit-for-bit, so two patches
/// that share an edge evaluate identical points along it.
#[inline]
#[must_use]
pub fn quad_point(corners: &[DVec3; 4], x: f64, y: f64) -> DVec3 {
    let [v0, v1, v2, v3] = *corners;
    let bottom = lerp(v0, v1, x);
    let top = lerp(v3, v2, x);
    lerp(bottom, top, y).normalize()
}

/// Un-normalized average of the four corners.
///
/// Lies inside the sphere; used as the centre of the patch's bounding sphere.
#[inline]
#[must_use]
pub fn quad_clip_centroid(corners: &[DVec3; 4]) -> DVec3 {
    (corners[0] + corners[1] + corners[2] + corners[3]) * 0.25
}

/// Smallest radius around `clip_centroid` enclosing the corners and the
/// projected centroid.
#[must_use]
pub fn quad_clip_radius(corners: &[DVec3; 4], clip_centroid: DVec3) -> f64 {
    let centroid = clip_centroid.normalize();
    corners
        .iter()
        .chain(std::iter::once(&centroid))
        .map(|v| (*v - clip_centroid).length())
        .fold(0.0, f64::max)
}

/// Corners of the four children, in quadrant order.
///
/// Quadrant 0 touches `v0`, 1 touches `v1`, 2 touches `v2`, 3 touches `v3`.
/// Edge midpoints are computed once and shared by the two siblings on
/// either side, and `(a + b)` is commutative, so a neighbouring patch that
/// computes the midpoint of the same edge gets the identical vector.
#[must_use]
pub fn split_quad(corners: &[DVec3; 4]) -> [[DVec3; 4]; 4] {
    let [v0, v1, v2, v3] = *corners;
    let v01 = (v0 + v1).normalize();
    let v12 = (v1 + v2).normalize();
    let v23 = (v2 + v3).normalize();
    let v30 = (v3 + v0).normalize();
    let cn = quad_clip_centroid(corners).normalize();
    [
        [v0, v01, cn, v30],
        [v01, v1, v12, cn],
        [cn, v12, v2, v23],
        [v30, cn, v23, v3],
    ]
}

#[inline]
fn lerp(a: DVec3, b: DVec3, t: f64) -> DVec3 {
    a * (1.0 - t) + b * t
}
