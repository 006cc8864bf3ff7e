use crate::error::SimError;
use crate::gpu::uniforms::PlanetParamsUniform;
use crate::utils::Vec3;

/// Immutable description of one planet instance. Constructed once, shared by
/// the CPU noise evaluator, the baker and the simulation; never mutated after
/// a bake.
#[derive(Debug, Clone)]
pub struct PlanetParams {
    pub radius: f32,
    pub noise_scale: f32,
    /// Height amplitude: surface radius ranges over [radius, radius + noise_height].
    pub noise_height: f32,
    pub warp_strength: f32,
    /// Normalized continental level below which terrain is flat ocean floor.
    pub ocean_floor_level: f32,
    /// Scale applied to the mountain/plains detail blend above the ocean floor.
    pub weight_multiplier: f32,
    pub ground_detail_freq: f32,
    pub detail_frequency: f32,
    pub ridge_sharpness: f32,
    pub mask_start: f32,
    pub mask_end: f32,
    /// Seeded offset shifting the whole noise domain.
    pub noise_offset: Vec3,
    pub seed: u32,
    /// Cube-map face resolution for baking.
    pub texture_resolution: u32,
    /// Density / influence grid resolution (cells per axis).
    pub grid_resolution: u32,
}

impl Default for PlanetParams {
    fn default() -> Self {
        Self {
            radius: 1000.0,
            noise_scale: 1.5,
            noise_height: 70.0,
            warp_strength: 0.15,
            ocean_floor_level: 0.0,
            weight_multiplier: 2.5,
            ground_detail_freq: 4.0,
            detail_frequency: 4.0,
            ridge_sharpness: 2.5,
            mask_start: 0.6,
            mask_end: 0.75,
            noise_offset: Vec3::ZERO,
            seed: 1111,
            texture_resolution: 1024,
            grid_resolution: 64,
        }
    }
}

impl PlanetParams {
    /// Checked before any GPU resource for a bake or a simulation is created.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.texture_resolution < 8 {
            return Err(SimError::InvalidParams(format!(
                "texture_resolution must be >= 8, got {}",
                self.texture_resolution
            )));
        }
        if !(self.radius > 0.0) {
            return Err(SimError::InvalidParams(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if self.grid_resolution == 0 {
            return Err(SimError::InvalidParams("grid_resolution must be non-zero".into()));
        }
        if !(self.mask_end > self.mask_start) {
            return Err(SimError::InvalidParams(format!(
                "mask_end ({}) must exceed mask_start ({})",
                self.mask_end, self.mask_start
            )));
        }
        Ok(())
    }

    /// Maximum possible distance from planet center to the surface.
    pub fn max_surface_radius(&self) -> f32 {
        self.radius + self.noise_height
    }

    pub fn to_uniform(&self) -> PlanetParamsUniform {
        PlanetParamsUniform {
            shape: [
                self.noise_scale,
                self.noise_height,
                self.warp_strength,
                0.0,
            ],
            floor: [
                self.ocean_floor_level,
                self.weight_multiplier,
                self.ground_detail_freq,
                0.0,
            ],
            offset_seed: [
                self.noise_offset.x,
                self.noise_offset.y,
                self.noise_offset.z,
                self.seed as f32,
            ],
            detail: [
                self.detail_frequency,
                self.ridge_sharpness,
                self.mask_start,
                self.mask_end,
            ],
            domain: [
                self.texture_resolution as f32,
                self.radius,
                self.grid_resolution as f32,
                0.0,
            ],
            _pad: [0.0; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        assert!(PlanetParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_tiny_resolution_and_bad_radius() {
        let mut p = PlanetParams::default();
        p.texture_resolution = 4;
        assert!(p.validate().is_err());

        let mut p = PlanetParams::default();
        p.radius = 0.0;
        assert!(p.validate().is_err());

        let mut p = PlanetParams::default();
        p.radius = f32::NAN;
        assert!(p.validate().is_err());
    }

    #[test]
    fn uniform_packing_places_resolution_and_radius() {
        let p = PlanetParams::default();
        let u = p.to_uniform();
        assert_eq!(u.domain[0], 1024.0);
        assert_eq!(u.domain[1], 1000.0);
        assert_eq!(u.detail[2], 0.6);
    }
}
