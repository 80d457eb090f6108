//! Cube-sphere topology: faces, root patch corners, quadtree patch addressing, and patch subdivision.

mod body;
mod cube_face;
mod patch_address;
mod quad;

pub use body::{BodyDef, BodyId};
pub use cube_face::{CubeFace, cube_corner};
pub use patch_address::PatchAddress;
pub use quad::{quad_clip_centroid, quad_clip_radius, quad_point, split_quad};
