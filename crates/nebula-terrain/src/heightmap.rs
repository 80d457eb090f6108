//! Multi-octave fractal Brownian motion (fBm) over the sphere surface.
//!
//! Noise is evaluated at 3D points on the unit sphere rather than at face
//! UVs, so there are no seams between cube faces and the value at a point
//! does not depend on which patch samples it.

use glam::DVec3;
use noise::{NoiseFn, Simplex};

/// Configuration for multi-octave fBm noise.
#[derive(Clone, Debug, PartialEq)]
pub struct FbmParams {
    /// Seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves to composite. More octaves add finer detail
    /// at the cost of additional computation.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves. Default: 2.0.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves. Default: 0.5.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per unit-sphere radius.
    pub base_frequency: f64,
    /// Amplitude of the first octave.
    pub amplitude: f64,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 10,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 1.5,
            amplitude: 1.0,
        }
    }
}

/// Samples fBm simplex noise at points on the unit sphere.
pub struct FbmSampler {
    noise: Simplex,
    params: FbmParams,
}

impl FbmSampler {
    /// Create a new sampler with the given parameters.
    pub fn new(params: FbmParams) -> Self {
        // Simplex takes a 32-bit seed; fold the high half in so both halves matter.
        let seed = (params.seed ^ (params.seed >> 32)) as u32;
        Self {
            noise: Simplex::new(seed),
            params,
        }
    }

    /// Sample the noise at a point on the unit sphere.
    ///
    /// The result lies within `±max_amplitude()`.
    pub fn sample(&self, point: DVec3) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;

        for _ in 0..self.params.octaves {
            let p = point * frequency;
            total += self.noise.get([p.x, p.y, p.z]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        total
    }

    /// Sample remapped from `±max_amplitude()` to `[0, 1]`.
    pub fn sample_unit(&self, point: DVec3) -> f64 {
        let max = self.max_amplitude();
        if max <= 0.0 {
            return 0.0;
        }
        (self.sample(point) / max * 0.5 + 0.5).clamp(0.0, 1.0)
    }

    /// Theoretical maximum absolute amplitude (geometric series sum).
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = self.params.amplitude;
        for _ in 0..self.params.octaves {
            sum += amp;
            amp *= self.params.persistence;
        }
        sum
    }

    /// Return a reference to the current parameters.
    pub fn params(&self) -> &FbmParams {
        &self.params
    }
}
