//! Level-of-detail decisions for cubesphere patches: split thresholds, frustum and horizon culling, and nearest-first dispatch ordering.

mod distance_queue;
mod frustum;
mod horizon_culling;
mod split;

pub use distance_queue::DistanceQueue;
pub use frustum::Frustum;
pub use horizon_culling::HorizonCuller;
pub use split::{DETAIL_EDGE_LENGTHS, SplitPolicy, body_max_depth, edge_length_for_detail};
