//! Packed output textures bridging simulation state to external renderers.
//!
//! Agent `i` lives at texel `(i % tex_width, i / tex_width)` in both the
//! position and color/status textures. Renderers sample these directly on
//! the GPU; the CPU readback path below exists for debugging only and is
//! throttled because it forces a full pipeline synchronization.

use log::debug;

use crate::error::SimError;
use crate::gpu::device::GpuDevice;
use crate::gpu::readback;

/// Frames between debug readbacks.
pub const READBACK_INTERVAL: u64 = 60;

/// Unique, invertible packing of a pool index into a texel coordinate.
pub fn index_to_texel(i: u32, tex_width: u32) -> (u32, u32) {
    (i % tex_width, i / tex_width)
}

pub fn texel_to_index(x: u32, y: u32, tex_width: u32) -> u32 {
    y * tex_width + x
}

pub struct OutputTextureExchange {
    pub position_texture: wgpu::Texture,
    pub position_view: wgpu::TextureView,
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub tex_width: u32,
    pub tex_height: u32,
    pub capacity: u32,
}

impl OutputTextureExchange {
    pub fn new(device: &wgpu::Device, capacity: u32, tex_width: u32) -> Self {
        let tex_height = capacity.div_ceil(tex_width).max(1);

        let make = |label: &str| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: tex_width,
                    height: tex_height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba32Float,
                usage: wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        };

        let position_texture = make("Agent Position Texture");
        let position_view = position_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let color_texture = make("Agent Color Texture");
        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            position_texture,
            position_view,
            color_texture,
            color_view,
            tex_width,
            tex_height,
            capacity,
        }
    }

    /// Blocking readback of per-agent positions. Debug path.
    pub fn read_positions(&self, gpu: &GpuDevice) -> Result<Vec<[f32; 4]>, SimError> {
        self.read_texture(gpu, &self.position_texture)
    }

    /// Blocking readback of per-agent color/status. Debug path.
    pub fn read_colors(&self, gpu: &GpuDevice) -> Result<Vec<[f32; 4]>, SimError> {
        self.read_texture(gpu, &self.color_texture)
    }

    /// Rate-limited debug readback: only fires every `READBACK_INTERVAL`
    /// frames, returning `None` on throttled frames.
    pub fn maybe_read_positions(
        &self,
        gpu: &GpuDevice,
        frame_index: u64,
    ) -> Option<Result<Vec<[f32; 4]>, SimError>> {
        if frame_index % READBACK_INTERVAL != 0 {
            return None;
        }
        debug!("debug position readback at frame {frame_index}");
        Some(self.read_positions(gpu))
    }

    fn read_texture(
        &self,
        gpu: &GpuDevice,
        texture: &wgpu::Texture,
    ) -> Result<Vec<[f32; 4]>, SimError> {
        let bytes = readback::read_texture_layers(
            &gpu.device,
            &gpu.queue,
            texture,
            self.tex_width,
            self.tex_height,
            1,
            16,
        )?;
        let mut texels: Vec<[f32; 4]> = bytemuck::cast_slice(&bytes).to_vec();
        texels.truncate(self.capacity as usize);
        Ok(texels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn packing_is_unique_and_invertible() {
        let capacity = 100u32;
        let tex_width = 16u32;
        let mut seen = HashSet::new();
        for i in 0..capacity {
            let (x, y) = index_to_texel(i, tex_width);
            assert!(x < tex_width);
            assert!(seen.insert((x, y)), "texel collision at index {i}");
            assert_eq!(texel_to_index(x, y, tex_width), i);
        }
    }

    #[test]
    fn texture_height_covers_capacity() {
        // ceil(100 / 16) rows hold at least 100 texels
        let tex_width = 16u32;
        let capacity = 100u32;
        let height = capacity.div_ceil(tex_width);
        assert!(height * tex_width >= capacity);
        let (x, y) = index_to_texel(capacity - 1, tex_width);
        assert!(y < height);
        assert_eq!((x, y), (3, 6));
    }
}
