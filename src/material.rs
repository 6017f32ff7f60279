//! Physical material properties shared between bodies.

use std::sync::Arc;

use crate::error::SimulationError;

/// Immutable bundle of material coefficients, shared between bodies via
/// [`Arc`]. The simulation core reads `specific_heat` (heat application)
/// and `elasticity` (collision restitution); the remaining coefficients
/// are carried for consumers such as renderers and thermal extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// kg/m³
    pub density: f64,
    /// J/(kg·K)
    pub specific_heat: f64,
    /// W/(m·K)
    pub thermal_conductivity: f64,
    /// Radiative emissivity in [0, 1].
    pub emissivity: f64,
    /// Coefficient of restitution in [0, 1].
    pub elasticity: f64,
    /// RGBA, linear.
    pub color: [f32; 4],
}

impl Material {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        density: f64,
        specific_heat: f64,
        thermal_conductivity: f64,
        emissivity: f64,
        elasticity: f64,
        color: [f32; 4],
    ) -> Result<Self, SimulationError> {
        if !density.is_finite() || density <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "material density must be finite and positive",
            ));
        }
        if !specific_heat.is_finite() || specific_heat <= 0.0 {
            return Err(SimulationError::InvalidInput(
                "material specific heat must be finite and positive",
            ));
        }
        if !thermal_conductivity.is_finite() || thermal_conductivity < 0.0 {
            return Err(SimulationError::InvalidInput(
                "material thermal conductivity must be finite and non-negative",
            ));
        }
        if !emissivity.is_finite() || !(0.0..=1.0).contains(&emissivity) {
            return Err(SimulationError::InvalidInput(
                "material emissivity must lie in [0, 1]",
            ));
        }
        if !elasticity.is_finite() || !(0.0..=1.0).contains(&elasticity) {
            return Err(SimulationError::InvalidInput(
                "material elasticity must lie in [0, 1]",
            ));
        }
        Ok(Self {
            name: name.into(),
            density,
            specific_heat,
            thermal_conductivity,
            emissivity,
            elasticity,
            color,
        })
    }

    /// Convenience for the common case of a material with a given
    /// elasticity and otherwise default coefficients.
    pub fn with_elasticity(elasticity: f64) -> Result<Arc<Self>, SimulationError> {
        let mut material = Material::default();
        if !elasticity.is_finite() || !(0.0..=1.0).contains(&elasticity) {
            return Err(SimulationError::InvalidInput(
                "material elasticity must lie in [0, 1]",
            ));
        }
        material.elasticity = elasticity;
        Ok(Arc::new(material))
    }
}

impl Default for Material {
    /// A generic rock-like material.
    fn default() -> Self {
        Self {
            name: "rock".to_string(),
            density: 3000.0,
            specific_heat: 800.0,
            thermal_conductivity: 2.0,
            emissivity: 0.9,
            elasticity: 0.5,
            color: [0.5, 0.5, 0.5, 1.0],
        }
    }
}
