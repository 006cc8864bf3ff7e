// Uniform blocks consumed by the compute kernels.

use bytemuck;

/// Per-dispatch parameter block, one canonical layout for every kernel:
/// five floats, four uints, padded from 36 logical bytes to 48.
#[repr(C, align(16))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameParams {
    pub delta: f32,
    pub time: f32,
    pub planet_radius: f32,
    pub noise_scale: f32,
    pub noise_height: f32,
    /// Kernel-specific knob; the agent kernels read it as the density
    /// kill threshold (0 disables density deaths).
    pub custom_param: u32,
    pub phase: u32,
    pub grid_res: u32,
    pub tex_width: u32,
    pub _pad: [u32; 3],
}

// Manually implement Pod and Zeroable since we have explicit padding
unsafe impl bytemuck::Pod for FrameParams {}
unsafe impl bytemuck::Zeroable for FrameParams {}

impl FrameParams {
    pub fn zeroed() -> Self {
        Self {
            delta: 0.0,
            time: 0.0,
            planet_radius: 0.0,
            noise_scale: 0.0,
            noise_height: 0.0,
            custom_param: 0,
            phase: 0,
            grid_res: 0,
            tex_width: 0,
            _pad: [0; 3],
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        delta: f32,
        time: f32,
        planet_radius: f32,
        noise_scale: f32,
        noise_height: f32,
        custom_param: u32,
        phase: u32,
        grid_res: u32,
        tex_width: u32,
    ) -> Self {
        Self {
            delta,
            time,
            planet_radius,
            noise_scale,
            noise_height,
            custom_param,
            phase,
            grid_res,
            tex_width,
            _pad: [0; 3],
        }
    }
}

/// Planet constants as six vec4 lanes, shared by the bake kernel and the
/// CPU-side packing in `terrain::params`.
#[repr(C, align(16))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlanetParamsUniform {
    /// (noise_scale, noise_height, warp_strength, reserved)
    pub shape: [f32; 4],
    /// (ocean_floor_level, weight_multiplier, ground_detail_freq, reserved)
    pub floor: [f32; 4],
    /// (offset.x, offset.y, offset.z, seed)
    pub offset_seed: [f32; 4],
    /// (detail_frequency, ridge_sharpness, mask_start, mask_end)
    pub detail: [f32; 4],
    /// (texture_resolution, radius, grid_resolution, reserved)
    pub domain: [f32; 4],
    pub _pad: [f32; 4],
}

unsafe impl bytemuck::Pod for PlanetParamsUniform {}
unsafe impl bytemuck::Zeroable for PlanetParamsUniform {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_params_is_48_bytes() {
        assert_eq!(std::mem::size_of::<FrameParams>(), 48);
        assert_eq!(std::mem::align_of::<FrameParams>(), 16);
    }

    #[test]
    fn planet_uniform_is_six_lanes() {
        assert_eq!(std::mem::size_of::<PlanetParamsUniform>(), 96);
    }

    #[test]
    fn field_order_survives_cast() {
        let fp = FrameParams::new(0.016, 1.0, 1000.0, 1.5, 70.0, 7, 2, 64, 256);
        let bytes = bytemuck::bytes_of(&fp);
        // floats occupy the first 20 bytes, uints the next 16
        let delta = f32::from_ne_bytes(bytes[0..4].try_into().unwrap());
        let custom = u32::from_ne_bytes(bytes[20..24].try_into().unwrap());
        let tex_width = u32::from_ne_bytes(bytes[32..36].try_into().unwrap());
        assert_eq!(delta, 0.016);
        assert_eq!(custom, 7);
        assert_eq!(tex_width, 256);
    }
}
