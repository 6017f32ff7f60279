//! Broad and narrow phase collision detection.

use std::sync::{Arc, Mutex};

use ahash::AHashSet;
use glam::DVec3;

use crate::body::BodyHandle;
use crate::collision::contact::{Contact, ContactInfo};
use crate::error::SimulationError;
use crate::octree::Octree;
use crate::pool::WorkPool;

/// Sphere-sphere narrow phase. Two spheres collide iff
/// `|p_a − p_b| < r_a + r_b` (strict; tangency is not a collision).
pub fn sphere_sphere(
    position_a: DVec3,
    radius_a: f64,
    position_b: DVec3,
    radius_b: f64,
) -> Option<ContactInfo> {
    let delta = position_b - position_a;
    let combined = radius_a + radius_b;
    let distance_sq = delta.length_squared();
    if distance_sq >= combined * combined {
        return None;
    }
    let distance = distance_sq.sqrt();
    Some(ContactInfo {
        point: (position_a * radius_b + position_b * radius_a) / combined,
        normal: delta.normalize_or_zero(),
        penetration: combined - distance,
    })
}

/// Detect all colliding pairs.
///
/// One task per body queries the octree for neighbours within
/// `radius + r_max` (the largest radius in the world bounds the window, so
/// no overlapping pair can be missed) and runs the narrow phase against
/// the live body states. Each unordered pair is reported exactly once, by
/// the body with the smaller id; octree duplicates from straddling
/// placements are dropped by a per-task seen-set.
pub fn find_contacts_parallel(
    bodies: &[BodyHandle],
    octree: &Arc<Octree>,
    pool: &WorkPool,
) -> Result<Vec<Contact>, SimulationError> {
    let mut max_radius = 0.0f64;
    for body in bodies {
        max_radius = max_radius.max(body.read().expect("body lock poisoned").radius());
    }

    let contacts = Arc::new(Mutex::new(Vec::new()));
    for body in bodies {
        let body = Arc::clone(body);
        let octree = Arc::clone(octree);
        let contacts = Arc::clone(&contacts);
        pool.submit(move || {
            let (id_a, position_a, radius_a, static_a, quarantined_a) = {
                let body = body.read().expect("body lock poisoned");
                (
                    body.id(),
                    body.position(),
                    body.radius(),
                    body.is_static(),
                    body.is_quarantined(),
                )
            };
            if quarantined_a {
                return;
            }

            let candidates = octree.query_sphere(position_a, radius_a + max_radius);
            let mut seen = AHashSet::new();
            for candidate in candidates {
                let (id_b, position_b, radius_b, static_b, quarantined_b) = {
                    let other = candidate.read().expect("body lock poisoned");
                    (
                        other.id(),
                        other.position(),
                        other.radius(),
                        other.is_static(),
                        other.is_quarantined(),
                    )
                };
                // The smaller id owns the pair; this also skips self-hits.
                if id_b <= id_a || !seen.insert(id_b) {
                    continue;
                }
                if (static_a && static_b) || quarantined_b {
                    continue;
                }
                if let Some(info) = sphere_sphere(position_a, radius_a, position_b, radius_b) {
                    contacts
                        .lock()
                        .expect("contact list poisoned")
                        .push(Contact {
                            body_a: Arc::clone(&body),
                            body_b: candidate,
                            info,
                        });
                }
            }
        })?;
    }
    pool.wait();

    let contacts = match Arc::try_unwrap(contacts) {
        Ok(collected) => collected.into_inner().expect("contact list poisoned"),
        Err(shared) => shared
            .lock()
            .expect("contact list poisoned")
            .drain(..)
            .collect(),
    };
    Ok(contacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::material::Material;
    use crate::math::Aabb;

    fn make_body(position: DVec3, radius: f64) -> BodyHandle {
        Body::new(1.0, radius, position, DVec3::ZERO, Arc::new(Material::default()))
            .expect("valid body")
            .into_handle()
    }

    #[test]
    fn test_sphere_sphere_geometry() {
        let info = sphere_sphere(
            DVec3::new(0.0, 0.0, 0.0),
            2.0,
            DVec3::new(2.0, 0.0, 0.0),
            1.0,
        )
        .expect("overlapping spheres");
        assert_eq!(info.normal, DVec3::new(1.0, 0.0, 0.0));
        assert!((info.penetration - 1.0).abs() < 1e-12);
        // point = (p_a·r_b + p_b·r_a)/(r_a+r_b) = (0·1 + 2·2)/3
        assert!((info.point.x - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_sphere_sphere_tangent_is_not_a_collision() {
        assert!(sphere_sphere(
            DVec3::ZERO,
            1.0,
            DVec3::new(2.0, 0.0, 0.0),
            1.0
        )
        .is_none());
        assert!(sphere_sphere(
            DVec3::ZERO,
            1.0,
            DVec3::new(5.0, 0.0, 0.0),
            1.0
        )
        .is_none());
    }

    #[test]
    fn test_coincident_centers_yield_zero_normal() {
        let info = sphere_sphere(DVec3::ONE, 1.0, DVec3::ONE, 1.0).expect("full overlap");
        assert_eq!(info.normal, DVec3::ZERO);
        assert!((info.penetration - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_find_contacts_reports_each_pair_once() {
        let octree = Arc::new(Octree::new(Aabb::new(
            DVec3::splat(-50.0),
            DVec3::splat(50.0),
        )));
        let pool = WorkPool::new(2);
        // A overlaps B; C is far away.
        let bodies = vec![
            make_body(DVec3::new(0.0, 0.0, 0.0), 1.0),
            make_body(DVec3::new(1.5, 0.0, 0.0), 1.0),
            make_body(DVec3::new(20.0, 0.0, 0.0), 1.0),
        ];
        for body in &bodies {
            octree.insert(body);
        }

        let contacts = find_contacts_parallel(&bodies, &octree, &pool).unwrap();
        assert_eq!(contacts.len(), 1, "exactly one overlapping pair");
        let contact = &contacts[0];
        assert!(
            contact.body_a.read().unwrap().id() < contact.body_b.read().unwrap().id(),
            "pair is ordered by id"
        );
        assert!((contact.info.penetration - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_static_static_pairs_are_skipped() {
        let octree = Arc::new(Octree::new(Aabb::new(
            DVec3::splat(-10.0),
            DVec3::splat(10.0),
        )));
        let pool = WorkPool::new(2);
        let bodies = vec![
            make_body(DVec3::new(0.0, 0.0, 0.0), 1.0),
            make_body(DVec3::new(1.0, 0.0, 0.0), 1.0),
        ];
        for body in &bodies {
            body.write().unwrap().set_static(true);
            octree.insert(body);
        }
        let contacts = find_contacts_parallel(&bodies, &octree, &pool).unwrap();
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_quarantined_bodies_are_skipped() {
        let octree = Arc::new(Octree::new(Aabb::new(
            DVec3::splat(-10.0),
            DVec3::splat(10.0),
        )));
        let pool = WorkPool::new(2);
        let bodies = vec![
            make_body(DVec3::new(0.0, 0.0, 0.0), 1.0),
            make_body(DVec3::new(1.0, 0.0, 0.0), 1.0),
        ];
        for body in &bodies {
            octree.insert(body);
        }
        {
            let mut body = bodies[0].write().unwrap();
            body.apply_force(DVec3::new(f64::INFINITY, 0.0, 0.0));
            body.update(0.1);
            assert!(body.is_quarantined());
        }
        let contacts = find_contacts_parallel(&bodies, &octree, &pool).unwrap();
        assert!(contacts.is_empty());
    }
}
