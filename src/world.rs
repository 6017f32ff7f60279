//! The world: body ownership and the per-tick stage pipeline.

use std::sync::Arc;

use ahash::AHashMap;
use glam::DVec3;

use crate::body::{Body, BodyHandle, BodyId};
use crate::collision::{self, BoundaryHandler};
use crate::config::WorldConfig;
use crate::error::SimulationError;
use crate::forces::{Force, ForceScope, GravitationalForce, G};
use crate::integrator::Integrator;
use crate::math::Aabb;
use crate::octree::Octree;
use crate::pool::WorkPool;

/// Owns the body set, the force list, the integrator, the octree, the
/// world bounds, and the work pool, and drives the fixed-order tick:
///
/// 1. Force accumulation (global forces fan out per body; pairwise forces
///    iterate the unordered pairs on the driver)
/// 2. Collision handling (parallel detect, sequential resolve, parallel
///    boundary pass), when enabled
/// 3. Integration
/// 4. Spatial refresh
///
/// Each stage is joined at a pool barrier before the next begins, so
/// observers see body state only at tick boundaries.
pub struct World {
    bodies: AHashMap<BodyId, BodyHandle>,
    forces: Vec<Arc<dyn Force>>,
    integrator: Arc<dyn Integrator>,
    octree: Arc<Octree>,
    bounds: Aabb,
    boundary: BoundaryHandler,
    pool: WorkPool,
    config: WorldConfig,
    elapsed: f64,
}

impl World {
    /// Build a world spanning `aabb_min..aabb_max`. Fails with
    /// `InvalidInput` for non-finite or zero-volume bounds, or an invalid
    /// configuration.
    pub fn new(
        aabb_min: DVec3,
        aabb_max: DVec3,
        config: WorldConfig,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        if !aabb_min.is_finite() || !aabb_max.is_finite() {
            return Err(SimulationError::InvalidInput("world bounds must be finite"));
        }
        let bounds = Aabb::new(aabb_min, aabb_max);
        if !bounds.has_volume() {
            return Err(SimulationError::InvalidInput(
                "world bounds must have positive volume",
            ));
        }

        let octree = Arc::new(Octree::with_limits(
            bounds,
            config.octree_max_bodies_per_leaf,
            config.octree_max_depth,
        ));
        let pool = WorkPool::new(config.worker_count);
        let mut forces: Vec<Arc<dyn Force>> = Vec::new();
        if config.gravity_enabled {
            forces.push(Arc::new(GravitationalForce::new(config.theta)));
        }
        let integrator = config.integrator.instantiate();
        tracing::debug!(
            workers = pool.worker_count(),
            gravity = config.gravity_enabled,
            collisions = config.collisions_enabled,
            "world created"
        );

        Ok(Self {
            bodies: AHashMap::new(),
            forces,
            integrator,
            octree,
            bounds,
            boundary: BoundaryHandler::new(bounds),
            pool,
            config,
            elapsed: 0.0,
        })
    }

    /// Insert a body, index it, and return its id.
    pub fn add_body(&mut self, body: Body) -> Result<BodyId, SimulationError> {
        if self.bodies.len() >= self.config.max_bodies {
            return Err(SimulationError::CapacityExceeded(self.config.max_bodies));
        }
        let id = body.id();
        let handle = body.into_handle();
        self.octree.insert(&handle);
        self.bodies.insert(id, handle);
        Ok(id)
    }

    /// Remove a body by id. Returns `false` for unknown ids, never panics.
    pub fn remove_body(&mut self, id: BodyId) -> bool {
        match self.bodies.remove(&id) {
            Some(_) => {
                self.octree.remove_id(id);
                true
            }
            None => false,
        }
    }

    pub fn add_force(&mut self, force: Arc<dyn Force>) {
        self.forces.push(force);
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) -> Result<(), SimulationError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "time step must be finite and positive",
            ));
        }
        let bodies: Vec<BodyHandle> = self.bodies.values().cloned().collect();

        // 1. Force accumulation
        for force in &self.forces {
            match force.scope() {
                ForceScope::Global => {
                    for body in &bodies {
                        let force = Arc::clone(force);
                        let body = Arc::clone(body);
                        let octree = Arc::clone(&self.octree);
                        self.pool.submit(move || force.apply_global(&body, &octree))?;
                    }
                }
                ForceScope::Pairwise => {
                    for i in 0..bodies.len() {
                        for j in (i + 1)..bodies.len() {
                            let (on_a, on_b) = force.apply_between(&bodies[i], &bodies[j]);
                            bodies[i]
                                .write()
                                .expect("body lock poisoned")
                                .apply_force(on_a);
                            bodies[j]
                                .write()
                                .expect("body lock poisoned")
                                .apply_force(on_b);
                        }
                    }
                }
            }
        }
        self.pool.wait();

        // 2. Collision handling
        if self.config.collisions_enabled {
            let contacts = collision::find_contacts_parallel(&bodies, &self.octree, &self.pool)?;
            tracing::trace!(contacts = contacts.len(), "collision stage");
            for contact in &contacts {
                collision::resolve_contact(contact, self.config.restitution);
            }
            if self.config.boundary_collisions_enabled {
                for body in &bodies {
                    let boundary = self.boundary;
                    let body = Arc::clone(body);
                    self.pool.submit(move || boundary.resolve(&body))?;
                }
                self.pool.wait();
            }
        }

        // 3. Integration
        Arc::clone(&self.integrator).integrate_all_parallel(&bodies, dt, &self.pool)?;

        // 4. Spatial refresh
        Arc::clone(&self.octree).update_all(&bodies, &self.pool)?;

        self.elapsed += dt;
        Ok(())
    }

    pub fn get_bodies(&self) -> Vec<BodyHandle> {
        self.bodies.values().cloned().collect()
    }

    pub fn get_body(&self, id: BodyId) -> Option<BodyHandle> {
        self.bodies.get(&id).cloned()
    }

    pub fn get_bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn get_spatial_structure(&self) -> Arc<Octree> {
        Arc::clone(&self.octree)
    }

    pub fn get_body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Close the work pool; subsequent steps fail with `PoolClosed`.
    pub fn close(&mut self) {
        self.pool.close();
    }

    /// Total kinetic energy, `Σ ½·m·v²`.
    pub fn kinetic_energy(&self) -> f64 {
        self.bodies
            .values()
            .map(|handle| {
                let body = handle.read().expect("body lock poisoned");
                0.5 * body.mass() * body.velocity().length_squared()
            })
            .sum()
    }

    /// Total gravitational potential energy over unordered pairs,
    /// `Σ −G·m_i·m_j / r`.
    pub fn potential_energy(&self) -> f64 {
        let snapshots: Vec<(DVec3, f64)> = self
            .bodies
            .values()
            .map(|handle| {
                let body = handle.read().expect("body lock poisoned");
                (body.position(), body.mass())
            })
            .collect();
        let mut energy = 0.0;
        for i in 0..snapshots.len() {
            for j in (i + 1)..snapshots.len() {
                let distance = snapshots[i].0.distance(snapshots[j].0);
                if distance * distance >= crate::forces::gravity::MIN_DISTANCE_SQ {
                    energy -= G * snapshots[i].1 * snapshots[j].1 / distance;
                }
            }
        }
        energy
    }

    /// Total linear momentum, `Σ m·v`.
    pub fn total_momentum(&self) -> DVec3 {
        self.bodies
            .values()
            .map(|handle| {
                let body = handle.read().expect("body lock poisoned");
                body.velocity() * body.mass()
            })
            .sum()
    }
}
