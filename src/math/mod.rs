//! Math primitives shared across the simulation core.
//!
//! All quantities are `f64` in SI base units (metres, kilograms, seconds,
//! kelvin, radians).

pub mod aabb;

pub use aabb::Aabb;

/// 3D vector type used throughout the engine.
pub type Vector3 = glam::DVec3;
