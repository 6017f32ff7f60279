//! Force abstractions applied during the accumulation stage.
//!
//! A force is either *global* (applied per body, possibly consulting the
//! spatial index) or *pairwise* (evaluated per unordered body pair). The
//! world dispatches global forces as one pool task per body and iterates
//! pairwise forces directly on the driver thread.

pub mod drag;
pub mod gravity;
pub mod uniform;

pub use drag::DragForce;
pub use gravity::{GravitationalForce, G};
pub use uniform::UniformForce;

use glam::DVec3;

use crate::body::BodyHandle;
use crate::octree::Octree;

/// How the world dispatches a force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceScope {
    /// One application per body.
    Global,
    /// One application per unordered body pair.
    Pairwise,
}

pub trait Force: Send + Sync + 'static {
    fn scope(&self) -> ForceScope;

    /// Apply the force to a single body. `octree` is the world's spatial
    /// index; forces that do not need it ignore the parameter.
    fn apply_global(&self, body: &BodyHandle, octree: &Octree);

    /// Evaluate the pair interaction, returning `(force_on_a, force_on_b)`.
    /// Forces that are not pairwise return zero vectors.
    fn apply_between(&self, _a: &BodyHandle, _b: &BodyHandle) -> (DVec3, DVec3) {
        (DVec3::ZERO, DVec3::ZERO)
    }
}
