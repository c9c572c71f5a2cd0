use bevy::prelude::Resource;

use crate::error::ConfigError;

/// Immutable-per-session simulation knobs. Validated once before any
/// buffer is allocated; never reconfigured at runtime.
///
/// Dissipations are per-tick retention factors normalized to a 60 Hz
/// reference tick (`retention^(dt * 60)`), so decay speed does not depend
/// on the display refresh rate.
#[derive(Resource, Clone, Debug)]
pub struct SimConfig {
    /// Short-axis cell count of the velocity/pressure/divergence grids.
    pub sim_resolution: u32,
    /// Short-axis cell count of the dye grid (usually higher: the dye is
    /// what gets displayed, the velocity only moves it around).
    pub dye_resolution: u32,
    /// Velocity retention per reference tick, in [0, 1].
    pub velocity_dissipation: f32,
    /// Dye retention per reference tick, in [0, 1].
    pub dye_dissipation: f32,
    /// Jacobi iterations for the pressure solve. A cost/accuracy trade-off,
    /// not solved to convergence.
    pub pressure_iterations: u32,
    /// Warm-start attenuation of last tick's pressure field, in [0, 1].
    pub pressure_retention: f32,
    /// Splat falloff radius as a fraction of the viewport's short axis.
    pub splat_radius: f32,
    /// Velocity injected per unit of normalized pointer speed.
    pub splat_force: f32,
    /// Vorticity confinement strength. Zero disables the pass.
    pub curl_strength: f32,
    /// Frame-time cap in seconds; longer frames are treated as one bounded
    /// step, never a catch-up burst.
    pub max_dt: f32,
    /// Pointer velocity ceiling in normalized spans per second. Spikes
    /// above this are clamped before they reach the splat pass.
    pub max_pointer_speed: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sim_resolution: 128,
            dye_resolution: 512,
            velocity_dissipation: 0.98,
            dye_dissipation: 0.97,
            pressure_iterations: 20,
            pressure_retention: 0.8,
            splat_radius: 0.05,
            splat_force: 2.0,
            curl_strength: 30.0,
            max_dt: 1.0 / 60.0,
            max_pointer_speed: 5.0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sim_resolution", self.sim_resolution as f32)?;
        positive("dye_resolution", self.dye_resolution as f32)?;
        unit_range("velocity_dissipation", self.velocity_dissipation)?;
        unit_range("dye_dissipation", self.dye_dissipation)?;
        if self.pressure_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        unit_range("pressure_retention", self.pressure_retention)?;
        positive("splat_radius", self.splat_radius)?;
        positive("splat_force", self.splat_force)?;
        // Zero disables confinement; a negative strength would silently
        // reverse the force.
        non_negative("curl_strength", self.curl_strength)?;
        positive("max_dt", self.max_dt)?;
        positive("max_pointer_speed", self.max_pointer_speed)?;
        Ok(())
    }

    /// Retention multiplier for one tick of length `dt`.
    #[inline]
    pub fn retention(per_tick: f32, dt: f32) -> f32 {
        per_tick.powf(dt * 60.0)
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

fn unit_range(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}
