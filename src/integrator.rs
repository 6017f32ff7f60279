//! Time integrators advancing body state once per tick.
//!
//! All integrators consume the per-tick acceleration accumulators (frozen
//! by the force stage) and clear them through `Body::advance`, which also
//! owns the static-body pinning and the non-finite quarantine check.

use std::sync::Arc;

use crate::body::BodyHandle;
use crate::error::SimulationError;
use crate::pool::WorkPool;

pub trait Integrator: Send + Sync + 'static {
    /// Advance a single body by `dt` seconds.
    fn integrate(&self, body: &BodyHandle, dt: f64);

    /// Sequential fallback over a body set.
    fn integrate_all(&self, bodies: &[BodyHandle], dt: f64) {
        for body in bodies {
            self.integrate(body, dt);
        }
    }

    /// Fan one integration task per body out to the pool and join. Tasks
    /// on distinct bodies commute; each touches only its own body.
    fn integrate_all_parallel(
        self: Arc<Self>,
        bodies: &[BodyHandle],
        dt: f64,
        pool: &WorkPool,
    ) -> Result<(), SimulationError> {
        for body in bodies {
            let integrator = Arc::clone(&self);
            let body = Arc::clone(body);
            pool.submit(move || integrator.integrate(&body, dt))?;
        }
        pool.wait();
        Ok(())
    }
}

/// Velocity-Verlet, the default. Delegates to [`crate::body::Body::update`],
/// which keeps the original engine's accumulator-reset quirk.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityVerlet;

impl Integrator for VelocityVerlet {
    fn integrate(&self, body: &BodyHandle, dt: f64) {
        body.write().expect("body lock poisoned").update(dt);
    }
}

/// Semi-implicit Euler: `v += a·dt`, then `x += v·dt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euler;

impl Integrator for Euler {
    fn integrate(&self, body: &BodyHandle, dt: f64) {
        let mut body = body.write().expect("body lock poisoned");
        let delta_velocity = body.acceleration() * dt;
        let delta_position = (body.velocity() + delta_velocity) * dt;
        let delta_angular_velocity = body.angular_acceleration() * dt;
        let delta_rotation = (body.angular_velocity() + delta_angular_velocity) * dt;
        body.advance(
            delta_position,
            delta_velocity,
            delta_rotation,
            delta_angular_velocity,
        );
    }
}

/// Classical fourth-order Runge-Kutta over the frozen per-tick
/// acceleration. With `a` constant across the step the scheme collapses to
/// the analytic constant-acceleration solution, but the four stages are
/// evaluated in full so replacing the derivative model later changes
/// nothing structurally.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rk4;

impl Integrator for Rk4 {
    fn integrate(&self, body: &BodyHandle, dt: f64) {
        let mut body = body.write().expect("body lock poisoned");

        let velocity = body.velocity();
        let acceleration = body.acceleration();
        // Derivative of (x, v) is (v, a); a is constant within the tick.
        let k1_v = velocity;
        let k2_v = velocity + acceleration * (dt * 0.5);
        let k3_v = velocity + acceleration * (dt * 0.5);
        let k4_v = velocity + acceleration * dt;
        let delta_position = (k1_v + k2_v * 2.0 + k3_v * 2.0 + k4_v) * (dt / 6.0);
        let delta_velocity = acceleration * dt;

        let angular_velocity = body.angular_velocity();
        let angular_acceleration = body.angular_acceleration();
        let k1_w = angular_velocity;
        let k2_w = angular_velocity + angular_acceleration * (dt * 0.5);
        let k3_w = angular_velocity + angular_acceleration * (dt * 0.5);
        let k4_w = angular_velocity + angular_acceleration * dt;
        let delta_rotation = (k1_w + k2_w * 2.0 + k3_w * 2.0 + k4_w) * (dt / 6.0);
        let delta_angular_velocity = angular_acceleration * dt;

        body.advance(
            delta_position,
            delta_velocity,
            delta_rotation,
            delta_angular_velocity,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::material::Material;
    use glam::DVec3;

    fn moving_body(velocity: DVec3, force: DVec3) -> BodyHandle {
        let mut body = Body::new(1.0, 1.0, DVec3::ZERO, velocity, Arc::new(Material::default()))
            .expect("valid body");
        body.apply_force(force);
        body.into_handle()
    }

    #[test]
    fn test_euler_constant_acceleration() {
        let body = moving_body(DVec3::new(1.0, 0.0, 0.0), DVec3::new(2.0, 0.0, 0.0));
        Euler.integrate(&body, 0.5);
        let body = body.read().unwrap();
        // v = 1 + 2·0.5 = 2; x = 2·0.5 = 1
        assert!((body.velocity().x - 2.0).abs() < 1e-12);
        assert!((body.position().x - 1.0).abs() < 1e-12);
        assert_eq!(body.acceleration(), DVec3::ZERO);
    }

    #[test]
    fn test_rk4_matches_constant_acceleration_closed_form() {
        let body = moving_body(DVec3::new(1.0, 0.0, 0.0), DVec3::new(2.0, 0.0, 0.0));
        Rk4.integrate(&body, 0.5);
        let body = body.read().unwrap();
        // x = v·dt + ½·a·dt² = 0.5 + 0.25; v = 1 + 2·0.5 = 2
        assert!((body.position().x - 0.75).abs() < 1e-12);
        assert!((body.velocity().x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_verlet_keeps_half_step_velocity() {
        let body = moving_body(DVec3::new(1.0, 0.0, 0.0), DVec3::new(2.0, 0.0, 0.0));
        VelocityVerlet.integrate(&body, 0.5);
        let body = body.read().unwrap();
        // Position gets the full ½·a·dt² term, velocity only ½·a·dt.
        assert!((body.position().x - 0.75).abs() < 1e-12);
        assert!((body.velocity().x - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_integrate_all_sequential() {
        let bodies: Vec<BodyHandle> = (0..10)
            .map(|_| moving_body(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO))
            .collect();
        Euler.integrate_all(&bodies, 1.0);
        for body in &bodies {
            assert!((body.read().unwrap().position().x - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_integrate_all_parallel_matches_sequential() {
        let pool = WorkPool::new(4);
        let parallel: Vec<BodyHandle> = (0..100)
            .map(|i| moving_body(DVec3::new(i as f64, 0.0, 0.0), DVec3::new(0.0, 1.0, 0.0)))
            .collect();
        let sequential: Vec<BodyHandle> = parallel
            .iter()
            .map(|handle| handle.read().unwrap().clone().into_handle())
            .collect();

        let integrator: Arc<dyn Integrator> = Arc::new(VelocityVerlet);
        integrator
            .clone()
            .integrate_all_parallel(&parallel, 0.25, &pool)
            .unwrap();
        VelocityVerlet.integrate_all(&sequential, 0.25);

        for (a, b) in parallel.iter().zip(&sequential) {
            let a = a.read().unwrap();
            let b = b.read().unwrap();
            assert_eq!(a.position(), b.position());
            assert_eq!(a.velocity(), b.velocity());
        }
    }

    #[test]
    fn test_static_body_is_pinned_by_every_integrator() {
        for integrator in [
            Arc::new(VelocityVerlet) as Arc<dyn Integrator>,
            Arc::new(Euler),
            Arc::new(Rk4),
        ] {
            let body = moving_body(DVec3::ZERO, DVec3::ZERO);
            {
                let mut body = body.write().unwrap();
                body.set_static(true);
            }
            integrator.integrate(&body, 1.0);
            let body = body.read().unwrap();
            assert_eq!(body.position(), DVec3::ZERO);
            assert_eq!(body.velocity(), DVec3::ZERO);
        }
    }
}
