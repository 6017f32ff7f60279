//! World configuration with a validated builder.

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::SimulationError;
use crate::forces::gravity::DEFAULT_THETA;
use crate::integrator::{Euler, Integrator, Rk4, VelocityVerlet};
use crate::octree::{DEFAULT_MAX_BODIES_PER_LEAF, DEFAULT_MAX_DEPTH};

/// Which integrator the world binds at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegratorKind {
    #[default]
    Verlet,
    Euler,
    Rk4,
}

impl IntegratorKind {
    pub(crate) fn instantiate(self) -> Arc<dyn Integrator> {
        match self {
            IntegratorKind::Verlet => Arc::new(VelocityVerlet),
            IntegratorKind::Euler => Arc::new(Euler),
            IntegratorKind::Rk4 => Arc::new(Rk4),
        }
    }
}

/// Configuration consumed by [`crate::world::World::new`].
///
/// Every option has the default shown; unspecified options fall back to it.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Nominal tick length in seconds. Default: 1/60.
    pub time_step: f64,
    /// Upper bound on the number of bodies. Default: 10 000.
    pub max_bodies: usize,
    /// Install N-body gravity at construction. Default: true.
    pub gravity_enabled: bool,
    /// Run the collision stage. Default: true.
    pub collisions_enabled: bool,
    /// Run the world-boundary pass inside the collision stage.
    /// Default: true.
    pub boundary_collisions_enabled: bool,
    /// World-level cap on the pair restitution coefficient, in [0, 1].
    /// Default: 1.0 (material elasticity decides).
    pub restitution: f64,
    /// Integrator bound at construction. Default: velocity-Verlet.
    pub integrator: IntegratorKind,
    /// Barnes-Hut opening angle. Default: 0.5.
    pub theta: f64,
    /// Octree leaf capacity before splitting. Default: 10.
    pub octree_max_bodies_per_leaf: usize,
    /// Octree division limit. Default: 8.
    pub octree_max_depth: usize,
    /// Worker threads in the pool. Default: available CPU parallelism.
    pub worker_count: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            time_step: 1.0 / 60.0,
            max_bodies: 10_000,
            gravity_enabled: true,
            collisions_enabled: true,
            boundary_collisions_enabled: true,
            restitution: 1.0,
            integrator: IntegratorKind::default(),
            theta: DEFAULT_THETA,
            octree_max_bodies_per_leaf: DEFAULT_MAX_BODIES_PER_LEAF,
            octree_max_depth: DEFAULT_MAX_DEPTH,
            worker_count: default_worker_count(),
        }
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

impl WorldConfig {
    pub fn builder() -> WorldConfigBuilder {
        WorldConfigBuilder {
            config: WorldConfig::default(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), SimulationError> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "time step must be finite and positive",
            ));
        }
        if self.max_bodies == 0 {
            return Err(SimulationError::InvalidInput(
                "max bodies must be at least 1",
            ));
        }
        if !self.restitution.is_finite() || !(0.0..=1.0).contains(&self.restitution) {
            return Err(SimulationError::InvalidInput(
                "restitution must lie in [0, 1]",
            ));
        }
        if !self.theta.is_finite() || self.theta < 0.0 {
            return Err(SimulationError::InvalidInput(
                "theta must be finite and non-negative",
            ));
        }
        if self.octree_max_bodies_per_leaf == 0 {
            return Err(SimulationError::InvalidInput(
                "octree leaf capacity must be at least 1",
            ));
        }
        if self.octree_max_depth == 0 {
            return Err(SimulationError::InvalidInput(
                "octree depth limit must be at least 1",
            ));
        }
        if self.worker_count == 0 {
            return Err(SimulationError::InvalidInput(
                "worker count must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Chainable builder; `build` validates the assembled configuration.
#[derive(Debug, Clone)]
pub struct WorldConfigBuilder {
    config: WorldConfig,
}

impl WorldConfigBuilder {
    pub fn time_step(mut self, time_step: f64) -> Self {
        self.config.time_step = time_step;
        self
    }

    pub fn max_bodies(mut self, max_bodies: usize) -> Self {
        self.config.max_bodies = max_bodies;
        self
    }

    pub fn gravity(mut self, enabled: bool) -> Self {
        self.config.gravity_enabled = enabled;
        self
    }

    pub fn collisions(mut self, enabled: bool) -> Self {
        self.config.collisions_enabled = enabled;
        self
    }

    pub fn boundary_collisions(mut self, enabled: bool) -> Self {
        self.config.boundary_collisions_enabled = enabled;
        self
    }

    pub fn restitution(mut self, restitution: f64) -> Self {
        self.config.restitution = restitution;
        self
    }

    pub fn integrator(mut self, integrator: IntegratorKind) -> Self {
        self.config.integrator = integrator;
        self
    }

    pub fn theta(mut self, theta: f64) -> Self {
        self.config.theta = theta;
        self
    }

    pub fn octree_max_bodies_per_leaf(mut self, capacity: usize) -> Self {
        self.config.octree_max_bodies_per_leaf = capacity;
        self
    }

    pub fn octree_max_depth(mut self, depth: usize) -> Self {
        self.config.octree_max_depth = depth;
        self
    }

    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.config.worker_count = worker_count;
        self
    }

    pub fn build(self) -> Result<WorldConfig, SimulationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.integrator, IntegratorKind::Verlet);
        assert!((config.theta - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.octree_max_bodies_per_leaf, 10);
        assert_eq!(config.octree_max_depth, 8);
        assert!(config.worker_count >= 1);
    }

    #[test]
    fn test_builder_overrides() {
        let config = WorldConfig::builder()
            .time_step(0.01)
            .gravity(false)
            .integrator(IntegratorKind::Rk4)
            .theta(0.8)
            .worker_count(2)
            .build()
            .expect("valid config");
        assert!((config.time_step - 0.01).abs() < f64::EPSILON);
        assert!(!config.gravity_enabled);
        assert_eq!(config.integrator, IntegratorKind::Rk4);
        assert_eq!(config.worker_count, 2);
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert!(WorldConfig::builder().time_step(0.0).build().is_err());
        assert!(WorldConfig::builder().time_step(f64::NAN).build().is_err());
        assert!(WorldConfig::builder().restitution(1.5).build().is_err());
        assert!(WorldConfig::builder().theta(-0.1).build().is_err());
        assert!(WorldConfig::builder().worker_count(0).build().is_err());
        assert!(WorldConfig::builder().max_bodies(0).build().is_err());
        assert!(WorldConfig::builder()
            .octree_max_bodies_per_leaf(0)
            .build()
            .is_err());
    }
}
