//! Shared setup helpers for the astrosim benchmarks.

use std::sync::Arc;

use astrosim::glam::DVec3;
use astrosim::{Aabb, Body, BodyHandle, Material, Octree, World, WorldConfig};

pub const WORLD_HALF_EXTENT: f64 = 200.0;

/// Deterministic cloud of random bodies inside the benchmark cube.
pub fn random_bodies(n: usize, seed: u64) -> Vec<Body> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let material = Arc::new(Material::default());
    (0..n)
        .map(|_| {
            let position = DVec3::new(
                (rng.f64() * 2.0 - 1.0) * WORLD_HALF_EXTENT * 0.9,
                (rng.f64() * 2.0 - 1.0) * WORLD_HALF_EXTENT * 0.9,
                (rng.f64() * 2.0 - 1.0) * WORLD_HALF_EXTENT * 0.9,
            );
            let velocity = DVec3::new(
                rng.f64() * 2.0 - 1.0,
                rng.f64() * 2.0 - 1.0,
                rng.f64() * 2.0 - 1.0,
            );
            Body::new(
                1e3 + rng.f64() * 1e4,
                0.5,
                position,
                velocity,
                Arc::clone(&material),
            )
            .expect("valid body")
        })
        .collect()
}

pub fn bench_bounds() -> Aabb {
    Aabb::new(
        DVec3::splat(-WORLD_HALF_EXTENT),
        DVec3::splat(WORLD_HALF_EXTENT),
    )
}

/// Octree pre-populated with `n` random bodies; returns the handles too.
pub fn populated_octree(n: usize) -> (Octree, Vec<BodyHandle>) {
    let octree = Octree::new(bench_bounds());
    let handles: Vec<BodyHandle> = random_bodies(n, 42)
        .into_iter()
        .map(Body::into_handle)
        .collect();
    for handle in &handles {
        octree.insert(handle);
    }
    (octree, handles)
}

/// World pre-populated with `n` random bodies under default settings.
pub fn populated_world(n: usize) -> anyhow::Result<World> {
    let config = WorldConfig::builder().max_bodies(n.max(1)).build()?;
    let mut world = World::new(
        DVec3::splat(-WORLD_HALF_EXTENT),
        DVec3::splat(WORLD_HALF_EXTENT),
        config,
    )?;
    for body in random_bodies(n, 42) {
        world.add_body(body)?;
    }
    Ok(world)
}
