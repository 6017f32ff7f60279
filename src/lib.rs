//! astrosim: 3D N-body rigid body simulation engine.
//!
//! Advances many interacting sphere bodies under long-range gravity and
//! short-range contact, keeping both sub-quadratic through an octree
//! spatial index.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **math** - f64 vector/AABB primitives (glam-based)
//! 2. **material** / **body** - shared material bundles, rigid body state
//! 3. **octree** - spatial index with per-node mass aggregates
//! 4. **forces** - global and pairwise force capability (Barnes-Hut
//!    gravity, uniform fields, drag)
//! 5. **integrator** - velocity-Verlet (default), Euler, RK4
//! 6. **collision** - sphere broad/narrow phase, impulse resolution,
//!    world-boundary reflection
//! 7. **pool** - bounded-queue worker pool with join-barrier semantics
//! 8. **world** - body ownership and the per-tick stage pipeline
//!
//! # Per-tick pipeline
//!
//! `World::step(dt)` runs force accumulation, collision handling,
//! integration, and spatial refresh in that order, joining the work pool
//! between stages so body state is only observable at tick boundaries.
//!
//! All public quantities are SI base units (m, kg, s, K, rad).

pub mod body;
pub mod collision;
pub mod config;
pub mod error;
pub mod forces;
pub mod integrator;
pub mod material;
pub mod math;
pub mod octree;
pub mod pool;
pub mod world;

// Re-export commonly used types
pub use body::{Body, BodyHandle, BodyId, RotationMode};
pub use collision::{BoundaryHandler, Contact, ContactInfo};
pub use config::{IntegratorKind, WorldConfig, WorldConfigBuilder};
pub use error::SimulationError;
pub use forces::{DragForce, Force, ForceScope, GravitationalForce, UniformForce, G};
pub use integrator::{Euler, Integrator, Rk4, VelocityVerlet};
pub use material::Material;
pub use math::{Aabb, Vector3};
pub use octree::Octree;
pub use pool::WorkPool;
pub use world::World;

// Re-export glam for convenience
pub use glam;
