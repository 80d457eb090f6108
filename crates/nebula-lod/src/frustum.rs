//! View frustum in f64 space with bounding-sphere tests.
//!
//! Patches are tested against the frustum before they are refined or drawn.
//! Planes are extracted from a double-precision view-projection matrix so
//! that body-local coordinates on planet-sized bodies keep full precision.

use glam::{DMat4, DVec3, DVec4};

/// Plane indices into the frustum planes array.
const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// A view frustum defined by six inward-pointing planes.
#[derive(Clone, Debug, PartialEq)]
pub struct Frustum {
    /// Six planes: left, right, bottom, top, near, far.
    /// Each `DVec4(a, b, c, d)` where `(a,b,c)` is the normalized inward
    /// normal and `d` is the signed distance term.
    planes: [DVec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a combined view-projection matrix
    /// using the Griggs-Hartmann method.
    ///
    /// Expects glam's `[0, 1]` clip-space depth range, as produced by
    /// `DMat4::perspective_rh` and friends.
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [DVec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// A frustum that contains everything. Used before the first camera
    /// update and by headless tooling.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            planes: [DVec4::W; 6],
        }
    }

    /// Signed distance of `point` to each plane; positive is inside.
    fn plane_distance(plane: &DVec4, point: DVec3) -> f64 {
        plane.truncate().dot(point) + plane.w
    }

    /// Whether `point` is inside all six planes.
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.planes
            .iter()
            .all(|plane| Self::plane_distance(plane, point) >= 0.0)
    }

    /// Whether a bounding sphere is at least partially inside the frustum.
    ///
    /// Conservative: spheres near the frustum corners may report visible
    /// when they are not, but a visible sphere is never rejected.
    #[must_use]
    pub fn test_sphere(&self, center: DVec3, radius: f64) -> bool {
        self.planes
            .iter()
            .all(|plane| Self::plane_distance(plane, center) >= -radius)
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self::unbounded()
    }
}
