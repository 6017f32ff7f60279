//! Linear drag.

use glam::DVec3;

use crate::body::BodyHandle;
use crate::error::SimulationError;
use crate::forces::{Force, ForceScope};
use crate::octree::Octree;

/// Linear velocity damping: `f = −k·v`.
pub struct DragForce {
    coefficient: f64,
}

impl DragForce {
    pub fn new(coefficient: f64) -> Result<Self, SimulationError> {
        if !coefficient.is_finite() || coefficient < 0.0 {
            return Err(SimulationError::InvalidInput(
                "drag coefficient must be finite and non-negative",
            ));
        }
        Ok(Self { coefficient })
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }
}

impl Force for DragForce {
    fn scope(&self) -> ForceScope {
        ForceScope::Global
    }

    fn apply_global(&self, body: &BodyHandle, _octree: &Octree) {
        let mut body = body.write().expect("body lock poisoned");
        let force = body.velocity() * -self.coefficient;
        body.apply_force(force);
    }
}
