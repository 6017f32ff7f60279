//! Contact data produced by the narrow phase.

use glam::DVec3;

use crate::body::BodyHandle;

/// Geometry of a single sphere-sphere overlap.
#[derive(Debug, Clone, Copy)]
pub struct ContactInfo {
    /// Contact point, radius-weighted between the centers.
    pub point: DVec3,
    /// Unit normal from A to B; zero when the centers coincide.
    pub normal: DVec3,
    /// Overlap depth along the normal.
    pub penetration: f64,
}

/// A detected overlap between two bodies, ready for resolution.
#[derive(Clone)]
pub struct Contact {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub info: ContactInfo,
}
