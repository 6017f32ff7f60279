//! Impulse-based contact resolution.

use crate::collision::contact::Contact;

/// Resolve one contact: exchange a normal impulse when the bodies are
/// approaching, then split the penetration correction by inverse mass.
///
/// The restitution coefficient is the smaller of the two material
/// elasticities, capped by the world-level `restitution_cap`. Static
/// bodies act as infinite mass (inverse mass zero); the resolution is a
/// no-op when both are static.
pub fn resolve_contact(contact: &Contact, restitution_cap: f64) {
    let (inverse_mass_a, velocity_a, elasticity_a) = {
        let body = contact.body_a.read().expect("body lock poisoned");
        (
            body.inverse_mass(),
            body.velocity(),
            body.material().elasticity,
        )
    };
    let (inverse_mass_b, velocity_b, elasticity_b) = {
        let body = contact.body_b.read().expect("body lock poisoned");
        (
            body.inverse_mass(),
            body.velocity(),
            body.material().elasticity,
        )
    };

    let inverse_mass_sum = inverse_mass_a + inverse_mass_b;
    if inverse_mass_sum == 0.0 {
        return;
    }

    let normal = contact.info.normal;
    let normal_velocity = (velocity_b - velocity_a).dot(normal);
    // Impulse only when approaching; separating pairs still get the
    // positional correction below.
    if normal_velocity < 0.0 {
        let restitution = elasticity_a.min(elasticity_b).min(restitution_cap);
        let impulse = -(1.0 + restitution) * normal_velocity / inverse_mass_sum;
        contact
            .body_a
            .write()
            .expect("body lock poisoned")
            .apply_impulse(normal * -impulse);
        contact
            .body_b
            .write()
            .expect("body lock poisoned")
            .apply_impulse(normal * impulse);
    }

    if contact.info.penetration > 0.0 {
        let correction = normal * (contact.info.penetration / inverse_mass_sum);
        contact
            .body_a
            .write()
            .expect("body lock poisoned")
            .translate(correction * -inverse_mass_a);
        contact
            .body_b
            .write()
            .expect("body lock poisoned")
            .translate(correction * inverse_mass_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyHandle};
    use crate::collision::detector::sphere_sphere;
    use crate::material::Material;
    use glam::DVec3;
    use std::sync::Arc;

    fn make_body(position: DVec3, velocity: DVec3, elasticity: f64) -> BodyHandle {
        Body::new(
            1.0,
            1.0,
            position,
            velocity,
            Material::with_elasticity(elasticity).unwrap(),
        )
        .expect("valid body")
        .into_handle()
    }

    fn contact_between(a: &BodyHandle, b: &BodyHandle) -> Contact {
        let (position_a, radius_a) = {
            let body = a.read().unwrap();
            (body.position(), body.radius())
        };
        let (position_b, radius_b) = {
            let body = b.read().unwrap();
            (body.position(), body.radius())
        };
        Contact {
            body_a: Arc::clone(a),
            body_b: Arc::clone(b),
            info: sphere_sphere(position_a, radius_a, position_b, radius_b)
                .expect("bodies overlap"),
        }
    }

    #[test]
    fn test_head_on_elastic_exchange() {
        let a = make_body(
            DVec3::new(-0.5, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            1.0,
        );
        let b = make_body(
            DVec3::new(0.5, 0.0, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
            1.0,
        );
        resolve_contact(&contact_between(&a, &b), 1.0);

        assert!((a.read().unwrap().velocity().x + 1.0).abs() < 1e-6);
        assert!((b.read().unwrap().velocity().x - 1.0).abs() < 1e-6);
        // Penetration of 1 split evenly between equal masses.
        let gap = b.read().unwrap().position().x - a.read().unwrap().position().x;
        assert!((gap - 2.0).abs() < 1e-9, "bodies pushed back to touching");
    }

    #[test]
    fn test_inelastic_collision_damps_velocity() {
        let a = make_body(
            DVec3::new(-0.5, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            0.0,
        );
        let b = make_body(
            DVec3::new(0.5, 0.0, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
            0.0,
        );
        resolve_contact(&contact_between(&a, &b), 1.0);
        // e = 0: velocities along the normal equalize.
        assert!(a.read().unwrap().velocity().x.abs() < 1e-9);
        assert!(b.read().unwrap().velocity().x.abs() < 1e-9);
    }

    #[test]
    fn test_restitution_cap_overrides_materials() {
        let a = make_body(
            DVec3::new(-0.5, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            1.0,
        );
        let b = make_body(
            DVec3::new(0.5, 0.0, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
            1.0,
        );
        resolve_contact(&contact_between(&a, &b), 0.0);
        assert!(a.read().unwrap().velocity().x.abs() < 1e-9);
    }

    #[test]
    fn test_static_body_acts_as_infinite_mass() {
        let wall = make_body(DVec3::new(0.5, 0.0, 0.0), DVec3::ZERO, 1.0);
        wall.write().unwrap().set_static(true);
        let ball = make_body(
            DVec3::new(-0.5, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            1.0,
        );
        let wall_position = wall.read().unwrap().position();

        resolve_contact(&contact_between(&ball, &wall), 1.0);

        assert!((ball.read().unwrap().velocity().x + 1.0).abs() < 1e-6);
        assert_eq!(wall.read().unwrap().position(), wall_position);
        assert_eq!(wall.read().unwrap().velocity(), DVec3::ZERO);
        // The full positional correction lands on the dynamic body.
        assert!(ball.read().unwrap().position().x < -0.5 + 1e-12);
    }

    #[test]
    fn test_separating_pair_keeps_velocities() {
        let a = make_body(
            DVec3::new(-0.5, 0.0, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
            1.0,
        );
        let b = make_body(
            DVec3::new(0.5, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            1.0,
        );
        resolve_contact(&contact_between(&a, &b), 1.0);
        assert!((a.read().unwrap().velocity().x + 1.0).abs() < 1e-12);
        assert!((b.read().unwrap().velocity().x - 1.0).abs() < 1e-12);
    }
}
