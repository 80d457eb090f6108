//! The boundary between the patch tree and whatever draws it.
//!
//! The geosphere owns no GPU resources. It hands vertex data to a
//! [`PatchRenderer`] when a patch first needs drawing, asks it to draw
//! visible leaves with a camera-relative transform, and tells it when an
//! uploaded patch is destroyed.

use glam::{DMat4, DVec3, Mat4};
use nebula_cubesphere::{BodyId, PatchAddress};

use crate::geometry::{PatchGeometryTemplate, PatchVertex};

/// Receives patch geometry and draw calls.
pub trait PatchRenderer {
    /// Store the vertices of a patch. `template` supplies its shared indices.
    fn upload_patch(
        &mut self,
        body: BodyId,
        address: PatchAddress,
        vertices: &[PatchVertex],
        template: &PatchGeometryTemplate,
    );

    /// Draw a previously uploaded patch.
    fn draw_patch(&mut self, body: BodyId, address: PatchAddress, transform: Mat4);

    /// Forget a previously uploaded patch; it will not be drawn again.
    fn release_patch(&mut self, body: BodyId, address: PatchAddress);
}

/// Model transform for a patch, relative to the camera.
///
/// Vertex positions are unit-sphere offsets from `clip_centroid`. The
/// translation is computed in f64 and only the small camera-relative
/// result is narrowed to f32, so precision holds at planetary distances.
#[must_use]
pub fn patch_transform(clip_centroid: DVec3, camera_unit: DVec3, radius: f64) -> Mat4 {
    let translation = (clip_centroid - camera_unit) * radius;
    (DMat4::from_translation(translation) * DMat4::from_scale(DVec3::splat(radius))).as_mat4()
}
