//! Split requests sent to worker threads and the results they produce.
//!
//! A [`SingleSplitRequest`] samples one patch (used for the six roots).
//! A [`QuadSplitRequest`] samples all four children of a patch at once.
//! Results carry the body and address they were requested for so the
//! owning sphere can route them back to the right node.

use std::fmt;
use std::sync::Arc;

use glam::DVec3;
use nebula_cubesphere::{BodyId, PatchAddress, split_quad};

use crate::generation::{PatchSamples, sample_patch};
use crate::jobs::Job;
use crate::terrain::Terrain;

/// Request to sample a single patch.
#[derive(Clone)]
pub struct SingleSplitRequest {
    /// Body the patch belongs to.
    pub body: BodyId,
    /// Address of the patch to sample.
    pub address: PatchAddress,
    /// The patch's unit-sphere corners.
    pub corners: [DVec3; 4],
    /// Vertices per patch edge.
    pub edge_len: u32,
    /// Surface to sample.
    pub terrain: Arc<dyn Terrain>,
}

/// Request to sample the four children of a patch.
#[derive(Clone)]
pub struct QuadSplitRequest {
    /// Body the patch belongs to.
    pub body: BodyId,
    /// Address of the parent being split.
    pub address: PatchAddress,
    /// The parent's unit-sphere corners.
    pub corners: [DVec3; 4],
    /// Vertices per patch edge.
    pub edge_len: u32,
    /// Surface to sample.
    pub terrain: Arc<dyn Terrain>,
}

impl fmt::Debug for SingleSplitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleSplitRequest")
            .field("body", &self.body)
            .field("address", &self.address)
            .field("edge_len", &self.edge_len)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for QuadSplitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuadSplitRequest")
            .field("body", &self.body)
            .field("address", &self.address)
            .field("edge_len", &self.edge_len)
            .finish_non_exhaustive()
    }
}

/// Sampled data for one patch.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleSplitResult {
    pub body: BodyId,
    pub address: PatchAddress,
    pub samples: PatchSamples,
}

/// Sampled data for one child of a quad split.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildPatchData {
    pub address: PatchAddress,
    pub corners: [DVec3; 4],
    pub samples: PatchSamples,
}

/// Sampled data for the four children of a patch, in quadrant order.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadSplitResult {
    pub body: BodyId,
    /// Address of the parent that was split.
    pub address: PatchAddress,
    pub children: [ChildPatchData; 4],
}

impl SingleSplitRequest {
    /// Sample the patch. Pure: the same request always yields the same result.
    pub fn generate(&self) -> SingleSplitResult {
        SingleSplitResult {
            body: self.body,
            address: self.address,
            samples: sample_patch(self.terrain.as_ref(), &self.corners, self.edge_len),
        }
    }
}

impl QuadSplitRequest {
    /// Sample all four children. Each child samples its own bordered grid.
    pub fn generate(&self) -> QuadSplitResult {
        let corners = split_quad(&self.corners);
        let addresses = self.address.children();
        let children = std::array::from_fn(|q| ChildPatchData {
            address: addresses[q],
            corners: corners[q],
            samples: sample_patch(self.terrain.as_ref(), &corners[q], self.edge_len),
        });
        QuadSplitResult {
            body: self.body,
            address: self.address,
            children,
        }
    }
}

/// Either kind of split request, as queued on the worker pool.
#[derive(Clone, Debug)]
pub enum SampleJob {
    Single(SingleSplitRequest),
    Quad(QuadSplitRequest),
}

/// Output of a [`SampleJob`].
#[derive(Clone, Debug, PartialEq)]
pub enum SampleOutcome {
    Single(SingleSplitResult),
    Quad(QuadSplitResult),
}

impl SampleJob {
    /// Body the request was made for.
    #[must_use]
    pub fn body(&self) -> BodyId {
        match self {
            SampleJob::Single(r) => r.body,
            SampleJob::Quad(r) => r.body,
        }
    }

    /// Address of the patch that made the request.
    #[must_use]
    pub fn address(&self) -> PatchAddress {
        match self {
            SampleJob::Single(r) => r.address,
            SampleJob::Quad(r) => r.address,
        }
    }
}

impl SampleOutcome {
    /// Body the result belongs to.
    #[must_use]
    pub fn body(&self) -> BodyId {
        match self {
            SampleOutcome::Single(r) => r.body,
            SampleOutcome::Quad(r) => r.body,
        }
    }

    /// Address of the patch that made the request.
    #[must_use]
    pub fn address(&self) -> PatchAddress {
        match self {
            SampleOutcome::Single(r) => r.address,
            SampleOutcome::Quad(r) => r.address,
        }
    }
}

impl Job for SampleJob {
    type Output = SampleOutcome;

    fn run(self) -> SampleOutcome {
        match self {
            SampleJob::Single(r) => SampleOutcome::Single(r.generate()),
            SampleJob::Quad(r) => SampleOutcome::Quad(r.generate()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FbmTerrain;
    use nebula_cubesphere::CubeFace;

    fn terrain() -> Arc<dyn Terrain> {
        Arc::new(FbmTerrain::new(42, 0.02, 1.0))
    }

    fn root_request(face: CubeFace, edge_len: u32) -> SingleSplitRequest {
        SingleSplitRequest {
            body: BodyId(1),
            address: PatchAddress::root(face),
            corners: face.root_corners(),
            edge_len,
            terrain: terrain(),
        }
    }

    #[test]
    fn test_root_patch_of_unit_sphere_is_fully_populated() {
        let result = root_request(CubeFace::PosZ, 15).generate();
        assert_eq!(result.body, BodyId(1));
        assert_eq!(result.address, PatchAddress::root(CubeFace::PosZ));
        assert_eq!(result.samples.len(), 15 * 15);
        assert_eq!(result.samples.normals.len(), 15 * 15);
        assert_eq!(result.samples.colors.len(), 15 * 15);
        for h in &result.samples.heights {
            assert!(!h.is_nan() && *h >= 0.0, "bad height {h}");
        }
    }

    #[test]
    fn test_single_request_is_deterministic() {
        let request = root_request(CubeFace::NegY, 7);
        assert_eq!(request.generate(), request.generate());
    }

    #[test]
    fn test_quad_children_follow_parent() {
        let parent = PatchAddress::root(CubeFace::PosX).child(2);
        let corners = split_quad(&CubeFace::PosX.root_corners())[2];
        let request = QuadSplitRequest {
            body: BodyId(3),
            address: parent,
            corners,
            edge_len: 7,
            terrain: terrain(),
        };
        let result = request.generate();
        assert_eq!(result.address, parent);
        let child_corners = split_quad(&corners);
        for (q, child) in result.children.iter().enumerate() {
            assert_eq!(child.address, parent.child(q as u8));
            assert_eq!(child.corners, child_corners[q]);
            assert_eq!(child.samples.len(), 49);
        }
    }

    #[test]
    fn test_quad_child_matches_single_request_for_same_corners() {
        let root = root_request(CubeFace::PosY, 7);
        let quad = QuadSplitRequest {
            body: root.body,
            address: root.address,
            corners: root.corners,
            edge_len: 7,
            terrain: Arc::clone(&root.terrain),
        }
        .generate();

        let single = SingleSplitRequest {
            address: quad.children[1].address,
            corners: quad.children[1].corners,
            ..root
        }
        .generate();
        assert_eq!(single.samples, quad.children[1].samples);
    }

    #[test]
    fn test_sample_job_dispatches_by_kind() {
        let job = SampleJob::Single(root_request(CubeFace::NegZ, 7));
        assert_eq!(job.body(), BodyId(1));
        assert_eq!(job.address(), PatchAddress::root(CubeFace::NegZ));
        match job.run() {
            SampleOutcome::Single(r) => assert_eq!(r.address, PatchAddress::root(CubeFace::NegZ)),
            SampleOutcome::Quad(_) => panic!("single request produced a quad result"),
        }
    }
}
