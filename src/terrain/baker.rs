//! One-shot terrain bake: evaluates the noise field over all six cube faces
//! on the GPU, producing height/normal/flow textures plus the global height
//! range via a fixed-point integer atomic reduction.

use log::{info, warn};
use wgpu::util::DeviceExt;

use crate::error::SimError;
use crate::gpu::device::GpuDevice;
use crate::gpu::readback;
use crate::gpu::structures::{dequantize_height, BakeStats};
use crate::gpu::wgsl::TERRAIN_BAKE_KERNEL;
use crate::terrain::cubemap::HeightField;
use crate::terrain::params::PlanetParams;

const WORKGROUP_SIZE: u32 = 8;

/// Baked terrain outputs. Textures are owned here and borrowed by the
/// simulation bind group for the lifetime of a planet.
pub struct BakeResult {
    pub height_texture: wgpu::Texture,
    pub height_view: wgpu::TextureView,
    pub normal_texture: wgpu::Texture,
    pub normal_view: wgpu::TextureView,
    pub flow_texture: wgpu::Texture,
    pub flow_view: wgpu::TextureView,
    pub min_height: f32,
    pub max_height: f32,
    pub resolution: u32,
}

impl BakeResult {
    /// Blocking readback of the full height cube for CPU-side sampling.
    pub fn read_height_field(&self, gpu: &GpuDevice) -> Result<HeightField, SimError> {
        let bytes = readback::read_texture_layers(
            &gpu.device,
            &gpu.queue,
            &self.height_texture,
            self.resolution,
            self.resolution,
            6,
            4,
        )?;
        Ok(HeightField::from_bytes(self.resolution, &bytes))
    }
}

pub struct TerrainBaker;

impl TerrainBaker {
    /// Bake the height field for `params`. Fails without creating any texture
    /// if the kernel does not validate; never returns a partial result.
    pub fn bake(gpu: &GpuDevice, params: &PlanetParams) -> Result<BakeResult, SimError> {
        params.validate()?;
        let device = &gpu.device;
        let res = params.texture_resolution;

        // Pipeline first: a broken kernel must abort before any texture exists
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Bake Shader"),
            source: TERRAIN_BAKE_KERNEL.clone(),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Bake Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::R32Float,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba16Float,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba16Float,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Bake Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Terrain Bake Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(SimError::PipelineValidation(e.to_string()));
        }

        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Planet Params Buffer"),
            contents: bytemuck::bytes_of(&params.to_uniform()),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let stats_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bake Stats Buffer"),
            contents: bytemuck::bytes_of(&BakeStats::identity()),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        });

        let make_texture = |label: &str, format: wgpu::TextureFormat| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: res,
                    height: res,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        };

        let height_texture = make_texture("Height Cube", wgpu::TextureFormat::R32Float);
        let normal_texture = make_texture("Normal Cube", wgpu::TextureFormat::Rgba16Float);
        let flow_texture = make_texture("Flow Cube", wgpu::TextureFormat::Rgba16Float);

        let array_view = |t: &wgpu::Texture| {
            t.create_view(&wgpu::TextureViewDescriptor {
                dimension: Some(wgpu::TextureViewDimension::D2Array),
                ..Default::default()
            })
        };
        let height_view = array_view(&height_texture);
        let normal_view = array_view(&normal_texture);
        let flow_view = array_view(&flow_texture);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Bake Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: stats_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&height_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&normal_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&flow_view),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Terrain Bake Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Terrain Bake Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let groups = res.div_ceil(WORKGROUP_SIZE);
            pass.dispatch_workgroups(groups, groups, 6);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let stats_bytes = readback::read_buffer(
            device,
            &gpu.queue,
            &stats_buffer,
            0,
            std::mem::size_of::<BakeStats>() as u64,
        )?;
        let stats: BakeStats = *bytemuck::from_bytes(&stats_bytes);
        let (min_height, max_height) = decode_range(&stats);

        info!(
            "baked {res}x{res}x6 terrain, height range [{min_height:.4}, {max_height:.4}]"
        );

        Ok(BakeResult {
            height_texture,
            height_view,
            normal_texture,
            normal_view,
            flow_texture,
            flow_view,
            min_height,
            max_height,
            resolution: res,
        })
    }
}

/// Decode the reduced fixed-point range, falling back to [0, 1] when the
/// reduction produced an inverted or non-finite range.
fn decode_range(stats: &BakeStats) -> (f32, f32) {
    let min = dequantize_height(stats.min_q);
    let max = dequantize_height(stats.max_q);
    if !min.is_finite() || !max.is_finite() || max < min {
        warn!("invalid baked height range [{min}, {max}], substituting [0, 1]");
        return (0.0, 1.0);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::structures::quantize_height;

    #[test]
    fn untouched_stats_fall_back_to_unit_range() {
        // No texel ever folded in: min stays MAX, max stays MIN
        let (min, max) = decode_range(&BakeStats::identity());
        assert_eq!((min, max), (0.0, 1.0));
    }

    #[test]
    fn valid_stats_decode_within_fixed_point_epsilon() {
        let stats = BakeStats {
            min_q: quantize_height(3.25),
            max_q: quantize_height(61.75),
        };
        let (min, max) = decode_range(&stats);
        assert!((min - 3.25).abs() < 1e-5);
        assert!((max - 61.75).abs() < 1e-5);
    }

    #[test]
    fn inverted_range_is_replaced() {
        let stats = BakeStats {
            min_q: quantize_height(10.0),
            max_q: quantize_height(2.0),
        };
        assert_eq!(decode_range(&stats), (0.0, 1.0));
    }
}
