//! Sphere collision detection and impulse-based resolution.
//!
//! Broad phase queries the octree per body; narrow phase is the strict
//! sphere-overlap test; resolution exchanges a normal impulse scaled by
//! the pair's restitution and splits the penetration correction by
//! inverse mass. A separate handler reflects bodies off the world bounds.

pub mod boundary;
pub mod contact;
pub mod detector;
pub mod resolver;

pub use boundary::BoundaryHandler;
pub use contact::{Contact, ContactInfo};
pub use detector::{find_contacts_parallel, sphere_sphere};
pub use resolver::resolve_contact;
