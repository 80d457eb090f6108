//! Procedural surface sampling for geospheres: the terrain function,
//! bordered patch sampling, split requests and the background job queue
//! that runs them.

mod generation;
mod heightmap;
mod jobs;
mod request;
mod terrain;

pub use generation::{BORDER_SIZE, PatchSamples, sample_patch};
pub use heightmap::{FbmParams, FbmSampler};
pub use jobs::{AsyncJobQueue, CompletedJob, Job, JobHandle, default_worker_count};
pub use request::{
    ChildPatchData, QuadSplitRequest, QuadSplitResult, SampleJob, SampleOutcome,
    SingleSplitRequest, SingleSplitResult,
};
pub use terrain::{FbmTerrain, Terrain};
