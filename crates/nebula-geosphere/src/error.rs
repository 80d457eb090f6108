//! Recoverable errors raised while driving geospheres.

use nebula_cubesphere::BodyId;

/// Errors returned by [`GeoSphere`](crate::GeoSphere) and
/// [`GeoSphereRegistry`](crate::GeoSphereRegistry).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GeoSphereError {
    /// A result arrived while the sphere's result queue was at capacity.
    /// The result was dropped; its patch retries on a later tick.
    #[error("result queue for {body} is full ({capacity} entries); result dropped")]
    ResultQueueFull { body: BodyId, capacity: usize },

    /// No sphere is registered for this body.
    #[error("no geosphere registered for {0}")]
    UnknownBody(BodyId),

    /// A sphere is already registered for this body.
    #[error("a geosphere is already registered for {0}")]
    DuplicateBody(BodyId),

    /// The detail level does not name an edge length.
    #[error("detail level {0} does not exist (expected 0..=4)")]
    InvalidDetailLevel(u8),
}
