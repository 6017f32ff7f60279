//! Uniform acceleration fields.

use glam::DVec3;

use crate::body::BodyHandle;
use crate::forces::{Force, ForceScope};
use crate::octree::Octree;

/// A constant acceleration field, e.g. flat-ground gravity or a steady
/// wind: `f = field · m`.
pub struct UniformForce {
    field: DVec3,
}

impl UniformForce {
    pub fn new(field: DVec3) -> Self {
        Self { field }
    }

    /// Downward gravity of `g` m/s² along -y.
    pub fn gravity(g: f64) -> Self {
        Self::new(DVec3::new(0.0, -g, 0.0))
    }

    pub fn field(&self) -> DVec3 {
        self.field
    }
}

impl Force for UniformForce {
    fn scope(&self) -> ForceScope {
        ForceScope::Global
    }

    fn apply_global(&self, body: &BodyHandle, _octree: &Octree) {
        let mut body = body.write().expect("body lock poisoned");
        let force = self.field * body.mass();
        body.apply_force(force);
    }
}
