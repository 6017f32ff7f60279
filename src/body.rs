//! Rigid body state, identity, and per-tick kinematics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use glam::DVec3;

use crate::error::SimulationError;
use crate::material::Material;
use crate::math::Aabb;

/// Stable 128-bit body identifier, assigned at construction and immutable
/// for the body's lifetime. The high half is a per-process random tag, the
/// low half a monotonically increasing counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(u128);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static ID_TAG: OnceLock<u64> = OnceLock::new();

impl BodyId {
    fn generate() -> Self {
        let tag = *ID_TAG.get_or_init(|| fastrand::u64(..));
        let counter = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self(((tag as u128) << 64) | counter as u128)
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Shared reference to a body. The world, the octree, forces, and pooled
/// tasks all hold these; locks are taken briefly and never nested.
pub type BodyHandle = Arc<RwLock<Body>>;

/// How `update` treats the orientation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    /// `rotation` is advanced from `angular_velocity` every step.
    Integrated,
    /// `rotation` is left untouched; an external driver owns orientation.
    External,
}

/// A spherical rigid body.
///
/// Angular motion treats the moment of inertia as unity: torques integrate
/// directly as angular acceleration. This is a documented simplification;
/// a full inertia tensor is a future extension. Temperature is passive
/// state: the core stores it and applies [`Body::add_heat`] but performs
/// no conduction between bodies.
#[derive(Debug, Clone)]
pub struct Body {
    id: BodyId,
    position: DVec3,
    velocity: DVec3,
    acceleration: DVec3,
    rotation: DVec3,
    angular_velocity: DVec3,
    angular_acceleration: DVec3,
    mass: f64,
    radius: f64,
    material: Arc<Material>,
    temperature: f64,
    is_static: bool,
    rotation_mode: RotationMode,
    quarantined: bool,
}

impl Body {
    /// Construct a dynamic body. Fails with `InvalidInput` for non-positive
    /// mass or radius, or non-finite position/velocity.
    pub fn new(
        mass: f64,
        radius: f64,
        position: DVec3,
        velocity: DVec3,
        material: Arc<Material>,
    ) -> Result<Self, SimulationError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "body mass must be finite and positive",
            ));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "body radius must be finite and positive",
            ));
        }
        if !position.is_finite() {
            return Err(SimulationError::InvalidInput("body position must be finite"));
        }
        if !velocity.is_finite() {
            return Err(SimulationError::InvalidInput("body velocity must be finite"));
        }
        Ok(Self {
            id: BodyId::generate(),
            position,
            velocity,
            acceleration: DVec3::ZERO,
            rotation: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            angular_acceleration: DVec3::ZERO,
            mass,
            radius,
            material,
            temperature: 293.15,
            is_static: false,
            rotation_mode: RotationMode::Integrated,
            quarantined: false,
        })
    }

    /// Builder-style rotation mode selection at construction time.
    pub fn with_rotation_mode(mut self, mode: RotationMode) -> Self {
        self.rotation_mode = mode;
        self
    }

    pub fn into_handle(self) -> BodyHandle {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn velocity(&self) -> DVec3 {
        self.velocity
    }

    pub fn acceleration(&self) -> DVec3 {
        self.acceleration
    }

    pub fn rotation(&self) -> DVec3 {
        self.rotation
    }

    pub fn angular_velocity(&self) -> DVec3 {
        self.angular_velocity
    }

    pub fn angular_acceleration(&self) -> DVec3 {
        self.angular_acceleration
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn rotation_mode(&self) -> RotationMode {
        self.rotation_mode
    }

    /// True once a non-finite state was detected; the body is frozen in
    /// place until [`Body::clear_quarantine`].
    pub fn is_quarantined(&self) -> bool {
        self.quarantined
    }

    /// `0` for static bodies (infinite mass), else `1/m`.
    pub fn inverse_mass(&self) -> f64 {
        if self.is_static {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// AABB of the bounding sphere.
    pub fn bounding_box(&self) -> Aabb {
        Aabb::new(
            self.position - DVec3::splat(self.radius),
            self.position + DVec3::splat(self.radius),
        )
    }

    /// Pin or release the body. Pinning zeroes the kinematic state; forces
    /// and torques applied afterwards are dropped.
    pub fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
        if is_static {
            self.velocity = DVec3::ZERO;
            self.acceleration = DVec3::ZERO;
            self.angular_velocity = DVec3::ZERO;
            self.angular_acceleration = DVec3::ZERO;
        }
    }

    pub fn set_position(&mut self, position: DVec3) -> Result<(), SimulationError> {
        if !position.is_finite() {
            return Err(SimulationError::InvalidInput("body position must be finite"));
        }
        self.position = position;
        Ok(())
    }

    pub fn set_velocity(&mut self, velocity: DVec3) -> Result<(), SimulationError> {
        if !velocity.is_finite() {
            return Err(SimulationError::InvalidInput("body velocity must be finite"));
        }
        self.velocity = velocity;
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: DVec3) -> Result<(), SimulationError> {
        if !rotation.is_finite() {
            return Err(SimulationError::InvalidInput("body rotation must be finite"));
        }
        self.rotation = rotation;
        Ok(())
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: DVec3) -> Result<(), SimulationError> {
        if !angular_velocity.is_finite() {
            return Err(SimulationError::InvalidInput(
                "body angular velocity must be finite",
            ));
        }
        self.angular_velocity = angular_velocity;
        Ok(())
    }

    pub fn set_mass(&mut self, mass: f64) -> Result<(), SimulationError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "body mass must be finite and positive",
            ));
        }
        self.mass = mass;
        Ok(())
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<(), SimulationError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "body radius must be finite and positive",
            ));
        }
        self.radius = radius;
        Ok(())
    }

    pub fn set_material(&mut self, material: Arc<Material>) {
        self.material = material;
    }

    pub fn set_temperature(&mut self, temperature: f64) -> Result<(), SimulationError> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(SimulationError::InvalidInput(
                "body temperature must be finite and non-negative",
            ));
        }
        self.temperature = temperature;
        Ok(())
    }

    /// Accumulate a force for the next integration step. Dropped for
    /// static and quarantined bodies.
    pub fn apply_force(&mut self, force: DVec3) {
        if self.is_static || self.quarantined {
            return;
        }
        self.acceleration += force / self.mass;
    }

    /// Accumulate a torque for the next integration step. With unit moment
    /// of inertia the torque is the angular acceleration.
    pub fn apply_torque(&mut self, torque: DVec3) {
        if self.is_static || self.quarantined {
            return;
        }
        self.angular_acceleration += torque;
    }

    /// Advance one velocity-Verlet step:
    ///
    /// ```text
    /// x += v·dt + ½·a·dt²
    /// v += ½·a·dt
    /// θ += ω·dt        (RotationMode::Integrated only)
    /// ω += ½·α·dt
    /// ```
    ///
    /// The accumulators are cleared at the tail, so the trailing half of
    /// the velocity average sees `a_{t+dt} = 0`. This mirrors the original
    /// engine's behaviour and is intentional.
    pub fn update(&mut self, dt: f64) {
        let delta_position = self.velocity * dt + self.acceleration * (0.5 * dt * dt);
        let delta_velocity = self.acceleration * (0.5 * dt);
        let delta_rotation = self.angular_velocity * dt;
        let delta_angular_velocity = self.angular_acceleration * (0.5 * dt);
        self.advance(
            delta_position,
            delta_velocity,
            delta_rotation,
            delta_angular_velocity,
        );
    }

    /// Apply precomputed integration deltas, clear the accumulators, and
    /// run the degeneracy check. Static bodies are pinned instead; a
    /// non-finite result rolls the position back and quarantines the body.
    pub(crate) fn advance(
        &mut self,
        delta_position: DVec3,
        delta_velocity: DVec3,
        delta_rotation: DVec3,
        delta_angular_velocity: DVec3,
    ) {
        if self.is_static {
            self.velocity = DVec3::ZERO;
            self.acceleration = DVec3::ZERO;
            self.angular_velocity = DVec3::ZERO;
            self.angular_acceleration = DVec3::ZERO;
            return;
        }
        if self.quarantined {
            return;
        }
        let previous_position = self.position;
        self.position += delta_position;
        self.velocity += delta_velocity;
        if self.rotation_mode == RotationMode::Integrated {
            self.rotation += delta_rotation;
        }
        self.angular_velocity += delta_angular_velocity;
        self.acceleration = DVec3::ZERO;
        self.angular_acceleration = DVec3::ZERO;

        if !self.position.is_finite() || !self.velocity.is_finite() {
            self.position = previous_position;
            self.quarantine();
        }
    }

    fn quarantine(&mut self) {
        self.quarantined = true;
        self.velocity = DVec3::ZERO;
        self.acceleration = DVec3::ZERO;
        self.angular_velocity = DVec3::ZERO;
        self.angular_acceleration = DVec3::ZERO;
        tracing::warn!(body = %self.id, "non-finite state detected, body frozen");
    }

    /// Release a quarantined body after its state has been corrected
    /// externally.
    pub fn clear_quarantine(&mut self) {
        self.quarantined = false;
    }

    /// Apply `q` joules of heat: `ΔT = q / (m·c)`.
    pub fn add_heat(&mut self, heat: f64) -> Result<(), SimulationError> {
        if !heat.is_finite() {
            return Err(SimulationError::InvalidInput("heat must be finite"));
        }
        if self.mass <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "heat requires a positive body mass",
            ));
        }
        let specific_heat = self.material.specific_heat;
        if specific_heat <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "heat requires a positive material specific heat",
            ));
        }
        self.temperature += heat / (self.mass * specific_heat);
        Ok(())
    }

    /// Instantaneous velocity change from an impulse (N·s). Dropped for
    /// static and quarantined bodies.
    pub(crate) fn apply_impulse(&mut self, impulse: DVec3) {
        if self.is_static || self.quarantined {
            return;
        }
        self.velocity += impulse * self.inverse_mass();
    }

    /// Positional shift used by penetration correction. Dropped for static
    /// and quarantined bodies.
    pub(crate) fn translate(&mut self, delta: DVec3) {
        if self.is_static || self.quarantined {
            return;
        }
        self.position += delta;
    }

    /// Boundary clamp: overwrite position and velocity with already
    /// validated values. Dropped for static and quarantined bodies.
    pub(crate) fn reflect(&mut self, position: DVec3, velocity: DVec3) {
        if self.is_static || self.quarantined {
            return;
        }
        self.position = position;
        self.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_body(mass: f64, radius: f64) -> Body {
        Body::new(
            mass,
            radius,
            DVec3::ZERO,
            DVec3::ZERO,
            Arc::new(Material::default()),
        )
        .expect("valid body")
    }

    #[test]
    fn test_ids_are_unique_and_stable() {
        let a = test_body(1.0, 1.0);
        let b = test_body(1.0, 1.0);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }

    #[test]
    fn test_constructor_rejects_bad_input() {
        let material = Arc::new(Material::default());
        assert!(Body::new(0.0, 1.0, DVec3::ZERO, DVec3::ZERO, material.clone()).is_err());
        assert!(Body::new(1.0, -1.0, DVec3::ZERO, DVec3::ZERO, material.clone()).is_err());
        assert!(Body::new(
            1.0,
            1.0,
            DVec3::new(f64::NAN, 0.0, 0.0),
            DVec3::ZERO,
            material.clone()
        )
        .is_err());
        assert!(Body::new(
            1.0,
            1.0,
            DVec3::ZERO,
            DVec3::new(0.0, f64::INFINITY, 0.0),
            material
        )
        .is_err());
    }

    #[test]
    fn test_apply_force_accumulates_acceleration() {
        let mut body = test_body(2.0, 1.0);
        body.apply_force(DVec3::new(4.0, 0.0, 0.0));
        body.apply_force(DVec3::new(0.0, 2.0, 0.0));
        assert_eq!(body.acceleration(), DVec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_verlet_update_uses_half_acceleration_for_velocity() {
        // The accumulator quirk: v gains ½·a·dt, x gains v·dt + ½·a·dt².
        let mut body = test_body(1.0, 1.0);
        body.set_velocity(DVec3::new(1.0, 0.0, 0.0)).unwrap();
        body.apply_force(DVec3::new(2.0, 0.0, 0.0));
        body.update(0.5);

        let expected_position = 1.0 * 0.5 + 0.5 * 2.0 * 0.25;
        let expected_velocity = 1.0 + 0.5 * 2.0 * 0.5;
        assert!((body.position().x - expected_position).abs() < 1e-12);
        assert!((body.velocity().x - expected_velocity).abs() < 1e-12);
        assert_eq!(body.acceleration(), DVec3::ZERO, "accumulator cleared");
    }

    #[test]
    fn test_rotation_modes() {
        let mut integrated = test_body(1.0, 1.0);
        integrated
            .set_angular_velocity(DVec3::new(0.0, 1.0, 0.0))
            .unwrap();
        integrated.update(2.0);
        assert_eq!(integrated.rotation(), DVec3::new(0.0, 2.0, 0.0));

        let mut external = test_body(1.0, 1.0).with_rotation_mode(RotationMode::External);
        external
            .set_angular_velocity(DVec3::new(0.0, 1.0, 0.0))
            .unwrap();
        external.update(2.0);
        assert_eq!(external.rotation(), DVec3::ZERO, "external mode leaves rotation alone");
    }

    #[test]
    fn test_torque_integrates_with_unit_inertia() {
        let mut body = test_body(10.0, 1.0);
        body.apply_torque(DVec3::new(0.0, 0.0, 3.0));
        assert_eq!(body.angular_acceleration(), DVec3::new(0.0, 0.0, 3.0));
        body.update(1.0);
        assert_eq!(body.angular_velocity(), DVec3::new(0.0, 0.0, 1.5));
    }

    #[test]
    fn test_static_body_drops_forces_and_pins_kinematics() {
        let mut body = test_body(5.0, 1.0);
        body.set_static(true);
        body.apply_force(DVec3::new(100.0, 0.0, 0.0));
        body.apply_torque(DVec3::new(0.0, 100.0, 0.0));
        assert_eq!(body.acceleration(), DVec3::ZERO);
        assert_eq!(body.angular_acceleration(), DVec3::ZERO);

        let position = body.position();
        body.update(1.0);
        assert_eq!(body.position(), position);
        assert_eq!(body.velocity(), DVec3::ZERO);
    }

    #[test]
    fn test_quarantine_on_non_finite_state() {
        let mut body = test_body(1.0, 1.0);
        let position = body.position();
        // An infinite force drives the accumulator non-finite; the update
        // must freeze the body instead of propagating NaN.
        body.apply_force(DVec3::new(f64::INFINITY, 0.0, 0.0));
        body.update(0.1);

        assert!(body.is_quarantined());
        assert_eq!(body.position(), position, "position rolled back");
        assert_eq!(body.velocity(), DVec3::ZERO);

        body.apply_force(DVec3::new(1.0, 0.0, 0.0));
        body.update(0.1);
        assert_eq!(body.position(), position, "frozen until cleared");

        body.clear_quarantine();
        body.apply_force(DVec3::new(1.0, 0.0, 0.0));
        body.update(0.1);
        assert!(body.position().x > position.x);
    }

    #[test]
    fn test_add_heat() {
        let mut body = test_body(2.0, 1.0);
        let specific_heat = body.material().specific_heat;
        let before = body.temperature();
        body.add_heat(2.0 * specific_heat * 10.0).unwrap();
        assert!((body.temperature() - before - 10.0).abs() < 1e-9);
        assert!(body.add_heat(f64::NAN).is_err());
    }

    #[test]
    fn test_setters_validate() {
        let mut body = test_body(1.0, 1.0);
        assert!(body.set_mass(-1.0).is_err());
        assert!(body.set_radius(0.0).is_err());
        assert!(body.set_position(DVec3::new(f64::NAN, 0.0, 0.0)).is_err());
        assert!(body.set_mass(2.0).is_ok());
        assert_eq!(body.mass(), 2.0);
    }

    #[test]
    fn test_inverse_mass() {
        let mut body = test_body(4.0, 1.0);
        assert!((body.inverse_mass() - 0.25).abs() < 1e-15);
        body.set_static(true);
        assert_eq!(body.inverse_mass(), 0.0);
    }

    #[test]
    fn test_bounding_box_covers_sphere() {
        let mut body = test_body(1.0, 2.0);
        body.set_position(DVec3::new(1.0, 2.0, 3.0)).unwrap();
        let aabb = body.bounding_box();
        assert_eq!(aabb.min, DVec3::new(-1.0, 0.0, 1.0));
        assert_eq!(aabb.max, DVec3::new(3.0, 4.0, 5.0));
    }
}
