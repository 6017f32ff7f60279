//! Newtonian gravity, hierarchical or exact.

use glam::DVec3;

use crate::body::BodyHandle;
use crate::forces::{Force, ForceScope};
use crate::octree::Octree;

/// Gravitational constant, m³/(kg·s²).
pub const G: f64 = 6.674_30e-11;

/// Squared separation below which gravitational interaction is dropped to
/// avoid singular forces. A silent guard, not an error.
pub const MIN_DISTANCE_SQ: f64 = 1e-10;

/// Default Barnes-Hut opening angle.
pub const DEFAULT_THETA: f64 = 0.5;

/// N-body gravity.
///
/// The default (global) mode delegates to the octree's Barnes-Hut
/// traversal with the configured opening angle. [`GravitationalForce::direct`]
/// yields a pairwise variant that evaluates the exact Newton force per
/// unordered pair, the right choice for small body counts, and the O(N²)
/// oracle the approximation is tested against.
pub struct GravitationalForce {
    theta: f64,
    scope: ForceScope,
}

impl GravitationalForce {
    pub fn new(theta: f64) -> Self {
        Self {
            theta,
            scope: ForceScope::Global,
        }
    }

    /// Exact pairwise gravity, no tree approximation.
    pub fn direct() -> Self {
        Self {
            theta: 0.0,
            scope: ForceScope::Pairwise,
        }
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }
}

impl Default for GravitationalForce {
    fn default() -> Self {
        Self::new(DEFAULT_THETA)
    }
}

impl Force for GravitationalForce {
    fn scope(&self) -> ForceScope {
        self.scope
    }

    fn apply_global(&self, body: &BodyHandle, octree: &Octree) {
        let snapshot = { body.read().expect("body lock poisoned").clone() };
        if snapshot.is_static() || snapshot.is_quarantined() {
            return;
        }
        let force = octree.calculate_gravity(&snapshot, self.theta);
        body.write().expect("body lock poisoned").apply_force(force);
    }

    fn apply_between(&self, a: &BodyHandle, b: &BodyHandle) -> (DVec3, DVec3) {
        let (position_a, mass_a) = {
            let body = a.read().expect("body lock poisoned");
            (body.position(), body.mass())
        };
        let (position_b, mass_b) = {
            let body = b.read().expect("body lock poisoned");
            (body.position(), body.mass())
        };

        let delta = position_b - position_a;
        let distance_sq = delta.length_squared();
        if distance_sq < MIN_DISTANCE_SQ {
            return (DVec3::ZERO, DVec3::ZERO);
        }
        let distance = distance_sq.sqrt();
        let force_on_a = delta * (G * mass_a * mass_b / (distance_sq * distance));
        (force_on_a, -force_on_a)
    }
}
