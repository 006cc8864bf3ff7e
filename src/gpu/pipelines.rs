// Compute pipeline construction for the per-frame simulation phases.
//
// The three agent kernels are entry points of one module sharing a single
// bind group; PaintPOI has its own module and layout. All creation runs
// inside a validation error scope so a bad kernel fails construction instead
// of surfacing later as an uncaptured error mid-frame.

use crate::error::SimError;
use crate::gpu::buffers::SimBuffers;
use crate::gpu::wgsl::{AGENT_SIM_KERNEL, POI_PAINT_KERNEL};
use crate::terrain::baker::BakeResult;

pub struct SimPipelines {
    pub clear_grid: wgpu::ComputePipeline,
    pub populate_grid: wgpu::ComputePipeline,
    pub update_agents: wgpu::ComputePipeline,
    pub poi_paint: wgpu::ComputePipeline,
    pub sim_bind_group: wgpu::BindGroup,
    pub poi_bind_group: wgpu::BindGroup,
}

impl SimPipelines {
    pub fn new(
        device: &wgpu::Device,
        buffers: &SimBuffers,
        terrain: &BakeResult,
    ) -> Result<Self, SimError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let sim_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Agent Sim Shader"),
            source: AGENT_SIM_KERNEL.clone(),
        });

        let sim_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Agent Sim Bind Group Layout"),
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
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 4,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2Array,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 5,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2Array,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 6,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: wgpu::TextureFormat::Rgba32Float,
                            view_dimension: wgpu::TextureViewDimension::D2,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 7,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: wgpu::TextureFormat::Rgba32Float,
                            view_dimension: wgpu::TextureViewDimension::D2,
                        },
                        count: None,
                    },
                ],
            });

        let sim_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Agent Sim Pipeline Layout"),
            bind_group_layouts: &[&sim_bind_group_layout],
            push_constant_ranges: &[],
        });

        let clear_grid = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Clear Grid Pipeline"),
            layout: Some(&sim_pipeline_layout),
            module: &sim_shader,
            entry_point: Some("clear_grid"),
            compilation_options: Default::default(),
            cache: None,
        });
        let populate_grid = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Populate Grid Pipeline"),
            layout: Some(&sim_pipeline_layout),
            module: &sim_shader,
            entry_point: Some("populate_grid"),
            compilation_options: Default::default(),
            cache: None,
        });
        let update_agents = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Update Agents Pipeline"),
            layout: Some(&sim_pipeline_layout),
            module: &sim_shader,
            entry_point: Some("update_agents"),
            compilation_options: Default::default(),
            cache: None,
        });

        let sim_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Agent Sim Bind Group"),
            layout: &sim_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.frame_uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.agent_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.grid_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.live_counter.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&terrain.height_view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&terrain.normal_view),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::TextureView(&buffers.output.position_view),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: wgpu::BindingResource::TextureView(&buffers.output.color_view),
                },
            ],
        });

        let poi_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("POI Paint Shader"),
            source: POI_PAINT_KERNEL.clone(),
        });

        let poi_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("POI Paint Bind Group Layout"),
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
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
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
                            view_dimension: wgpu::TextureViewDimension::D3,
                        },
                        count: None,
                    },
                ],
            });

        let poi_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("POI Paint Pipeline Layout"),
            bind_group_layouts: &[&poi_bind_group_layout],
            push_constant_ranges: &[],
        });
        let poi_paint = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("POI Paint Pipeline"),
            layout: Some(&poi_pipeline_layout),
            module: &poi_shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let poi_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("POI Paint Bind Group"),
            layout: &poi_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.frame_uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.poi_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&buffers.influence_view),
                },
            ],
        });

        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(SimError::PipelineValidation(e.to_string()));
        }

        Ok(Self {
            clear_grid,
            populate_grid,
            update_agents,
            poi_paint,
            sim_bind_group,
            poi_bind_group,
        })
    }
}
