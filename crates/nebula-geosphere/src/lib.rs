//! Level-of-detail cube-sphere terrain: a quadtree of patches per body,
//! refined and merged around the camera, with patch data sampled on
//! background workers.

mod error;
mod geometry;
mod patch;
mod registry;
mod render;
mod sphere;

pub use error::GeoSphereError;
pub use geometry::{PatchGeometryTemplate, PatchVertex, SKIRT_SCALE, TemplateCache};
pub use patch::{LodView, Patch, PatchId, PatchTree, StaleResult};
pub use registry::GeoSphereRegistry;
pub use render::{PatchRenderer, patch_transform};
pub use sphere::{GeoSphere, GeoSphereSettings, InitStage, SphereStats};
