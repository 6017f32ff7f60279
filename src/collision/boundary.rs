//! World-boundary reflection.

use glam::DVec3;

use crate::body::BodyHandle;
use crate::math::Aabb;

/// Clamps bodies into the world AABB and reflects the violating velocity
/// component, damped by the body's material elasticity.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryHandler {
    bounds: Aabb,
}

impl BoundaryHandler {
    pub fn new(bounds: Aabb) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Per-axis: compare `position ± radius` against the bounds; on
    /// violation clamp the position inside and invert the outgoing
    /// velocity component scaled by the elasticity. Static and
    /// quarantined bodies are left alone.
    pub fn resolve(&self, body: &BodyHandle) {
        let mut body = body.write().expect("body lock poisoned");
        if body.is_static() || body.is_quarantined() {
            return;
        }

        let radius = body.radius();
        let elasticity = body.material().elasticity;
        let mut position = body.position().to_array();
        let mut velocity = body.velocity().to_array();
        let min = self.bounds.min.to_array();
        let max = self.bounds.max.to_array();
        let mut reflected = false;

        for axis in 0..3 {
            let low = min[axis] + radius;
            let high = max[axis] - radius;
            if position[axis] < low {
                position[axis] = low;
                if velocity[axis] < 0.0 {
                    velocity[axis] = -velocity[axis] * elasticity;
                }
                reflected = true;
            } else if position[axis] > high {
                position[axis] = high;
                if velocity[axis] > 0.0 {
                    velocity[axis] = -velocity[axis] * elasticity;
                }
                reflected = true;
            }
        }

        if reflected {
            body.reflect(DVec3::from_array(position), DVec3::from_array(velocity));
        }
    }
}
