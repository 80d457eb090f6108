//! Identity and immutable parameters of a spherical body.

use std::fmt;

/// Stable identity of a body (planet, moon, asteroid).
///
/// Completed terrain jobs carry this id so they can be routed back to the
/// sphere that requested them without any global lookup table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Definition of a body whose surface is rendered as a cubesphere.
///
/// This is the immutable definition of the body. Runtime state (patch
/// trees, in-flight jobs) belongs to the sphere that renders it.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyDef {
    /// Identity used to route asynchronous results.
    pub id: BodyId,
    /// Human-readable name (e.g., "Terra", "Luna").
    pub name: String,
    /// Radius of the base sphere in meters, before terrain displacement.
    pub radius: f64,
    /// Seed for the body's procedural terrain.
    pub seed: u64,
}

impl BodyDef {
    /// Construct a new body definition.
    ///
    /// # Panics
    ///
    /// Panics if `radius` is not a positive finite number.
    pub fn new(id: BodyId, name: impl Into<String>, radius: f64, seed: u64) -> Self {
        assert!(
            radius.is_finite() && radius > 0.0,
            "Body radius must be positive, got {radius}"
        );
        Self {
            id,
            name: name.into(),
            radius,
            seed,
        }
    }

    /// Earth-like planet preset (radius 6,371 km).
    pub fn earth_like(id: BodyId, name: impl Into<String>, seed: u64) -> Self {
        Self::new(id, name, 6_371_000.0, seed)
    }

    /// Moon-like body preset (radius 1,737.4 km).
    pub fn moon_like(id: BodyId, name: impl Into<String>, seed: u64) -> Self {
        Self::new(id, name, 1_737_400.0, seed)
    }

    /// The circumference of the base sphere in meters.
    #[must_use]
    pub fn circumference(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.radius
    }
}
