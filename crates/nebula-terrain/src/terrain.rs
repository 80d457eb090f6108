//! The height/colour function a body's surface is generated from.

use glam::DVec3;

use crate::heightmap::{FbmParams, FbmSampler};

/// Procedural surface of a body.
///
/// Implementations must be pure: the same point always yields the same
/// height and colour. Patches at different depths sample shared edge
/// points independently and rely on this to line up.
pub trait Terrain: Send + Sync {
    /// Height above the base sphere at a unit-sphere point, as a fraction
    /// of the body radius. Must be finite and non-negative.
    fn height(&self, point: DVec3) -> f64;

    /// Linear RGB colour in `[0, 1]` for a surface point, given its height
    /// and the surface normal at that point.
    fn color(&self, point: DVec3, height: f64, normal: DVec3) -> DVec3;
}

/// Colour stops of the height ramp, from the lowest ground upwards.
const HEIGHT_RAMP: [(f64, [f64; 3]); 5] = [
    (0.0, [0.05, 0.12, 0.35]),
    (0.35, [0.76, 0.70, 0.50]),
    (0.45, [0.20, 0.45, 0.15]),
    (0.75, [0.45, 0.40, 0.35]),
    (0.92, [0.95, 0.95, 0.97]),
];

const CLIFF_COLOR: [f64; 3] = [0.35, 0.32, 0.30];

/// Fractal terrain: fBm heights with a banded colour ramp darkened
/// towards bare rock on steep slopes.
pub struct FbmTerrain {
    sampler: FbmSampler,
    /// Highest possible height, as a fraction of the body radius.
    max_height: f64,
}

impl FbmTerrain {
    /// Terrain for a body of `radius` meters whose features rise at most
    /// `max_feature_height` meters above the base sphere.
    ///
    /// # Panics
    ///
    /// Panics if `radius` is not positive or `max_feature_height` is negative.
    pub fn new(seed: u64, max_feature_height: f64, radius: f64) -> Self {
        assert!(radius > 0.0, "radius must be positive, got {radius}");
        assert!(
            max_feature_height >= 0.0,
            "max_feature_height must be non-negative, got {max_feature_height}"
        );
        Self::with_params(
            FbmParams {
                seed,
                ..Default::default()
            },
            max_feature_height / radius,
        )
    }

    /// Terrain from explicit noise parameters and a relative maximum height.
    pub fn with_params(params: FbmParams, max_height: f64) -> Self {
        Self {
            sampler: FbmSampler::new(params),
            max_height,
        }
    }

    /// Highest possible height, as a fraction of the body radius.
    pub fn max_height(&self) -> f64 {
        self.max_height
    }
}

impl Terrain for FbmTerrain {
    fn height(&self, point: DVec3) -> f64 {
        self.sampler.sample_unit(point) * self.max_height
    }

    fn color(&self, point: DVec3, height: f64, normal: DVec3) -> DVec3 {
        let t = if self.max_height > 0.0 {
            (height / self.max_height).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let base = ramp(t);
        // 0 on flat ground, 1 on a vertical cliff.
        let steepness = (1.0 - normal.dot(point.normalize())).clamp(0.0, 1.0);
        base.lerp(DVec3::from_array(CLIFF_COLOR), (steepness * 4.0).min(1.0))
    }
}

fn ramp(t: f64) -> DVec3 {
    let mut previous = HEIGHT_RAMP[0];
    for stop in HEIGHT_RAMP.iter().skip(1) {
        if t <= stop.0 {
            let span = stop.0 - previous.0;
            let local = if span > 0.0 { (t - previous.0) / span } else { 0.0 };
            return DVec3::from_array(previous.1).lerp(DVec3::from_array(stop.1), local);
        }
        previous = *stop;
    }
    DVec3::from_array(previous.1)
}
