//! Horizon culling against the idealized sphere of a body.
//!
//! A patch whose bounding sphere lies entirely inside the body's silhouette
//! cone and entirely behind its horizon plane cannot be seen from the
//! camera, whatever its terrain looks like, as long as the terrain never
//! dips below the idealized sphere.

use glam::DVec3;

/// Horizon culling state computed from camera position and body geometry.
#[derive(Clone, Debug)]
pub struct HorizonCuller {
    /// Camera position in the body's frame.
    camera_pos: DVec3,
    /// Radius of the idealized occluding sphere.
    radius: f64,
    /// Distance from camera to the occluder's centre.
    camera_distance: f64,
    /// Unit vector from the camera towards the occluder's centre.
    axis: DVec3,
    /// Distance along `axis` from the camera to the plane of the horizon
    /// circle. Everything beyond it and inside the cone is hidden.
    horizon_plane_dist: f64,
    /// Half-angle of the occluder's silhouette cone, in radians.
    cone_half_angle: f64,
}

impl HorizonCuller {
    /// Create a new culler for a camera looking at a sphere.
    pub fn new(camera_pos: DVec3, center: DVec3, radius: f64) -> Self {
        let to_center = center - camera_pos;
        let camera_distance = to_center.length();

        let (axis, horizon_plane_dist, cone_half_angle) = if camera_distance > radius {
            let axis = to_center / camera_distance;
            // Tangent points sit at d - r²/d along the axis; sin(cone) = r / d.
            let plane = (camera_distance * camera_distance - radius * radius) / camera_distance;
            (axis, plane, (radius / camera_distance).asin())
        } else {
            // Camera inside the occluder: nothing is culled.
            (DVec3::ZERO, 0.0, 0.0)
        };

        Self {
            camera_pos,
            radius,
            camera_distance,
            axis,
            horizon_plane_dist,
            cone_half_angle,
        }
    }

    /// True if the camera is on or inside the occluding sphere.
    #[must_use]
    pub fn camera_inside(&self) -> bool {
        self.camera_distance <= self.radius
    }

    /// Test whether a bounding sphere is entirely hidden by the occluder.
    ///
    /// Returns `false` whenever any part of the sphere might be visible,
    /// including when the camera is inside the bounding sphere itself.
    #[must_use]
    pub fn is_occluded(&self, center: DVec3, radius: f64) -> bool {
        if self.camera_inside() {
            return false;
        }

        let to_object = center - self.camera_pos;
        let object_distance = to_object.length();
        if object_distance <= radius {
            return false;
        }

        // Any part in front of the horizon plane can be seen.
        let along = to_object.dot(self.axis);
        if along - radius < self.horizon_plane_dist {
            return false;
        }

        // Must also sit entirely inside the silhouette cone.
        let cos_angle = (along / object_distance).clamp(-1.0, 1.0);
        let angle = cos_angle.acos();
        let angular_radius = (radius / object_distance).asin();
        angle + angular_radius <= self.cone_half_angle
    }

    /// Inverse of [`is_occluded`](Self::is_occluded).
    #[must_use]
    pub fn is_above_horizon(&self, center: DVec3, radius: f64) -> bool {
        !self.is_occluded(center, radius)
    }

    /// Straight-line distance from camera to the horizon tangent circle.
    #[must_use]
    pub fn horizon_distance(&self) -> f64 {
        if self.camera_inside() {
            return 0.0;
        }
        (self.camera_distance * self.camera_distance - self.radius * self.radius).sqrt()
    }

    /// Camera altitude above the idealized sphere.
    #[must_use]
    pub fn camera_altitude(&self) -> f64 {
        (self.camera_distance - self.radius).max(0.0)
    }
}
