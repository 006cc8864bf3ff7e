// GPU buffers module - owns every simulation buffer and texture. Everything
// is allocated once here; per-frame work only writes into existing resources.

use wgpu::util::DeviceExt;
use bytemuck::Zeroable;

use crate::gpu::structures::{AgentRecord, PoiRecord};
use crate::gpu::uniforms::FrameParams;
use crate::sim::output::OutputTextureExchange;
use crate::sim::state::Counter;

pub struct SimBuffers {
    pub capacity: u32,
    pub grid_res: u32,
    pub frame_uniform: wgpu::Buffer,
    pub agent_buffer: wgpu::Buffer,
    pub grid_buffer: wgpu::Buffer,
    pub poi_buffer: wgpu::Buffer,
    pub live_counter: Counter,
    pub influence_texture: wgpu::Texture,
    pub influence_view: wgpu::TextureView,
    pub output: OutputTextureExchange,
}

impl SimBuffers {
    pub fn new(
        device: &wgpu::Device,
        capacity: u32,
        grid_res: u32,
        tex_width: u32,
        pois: &[PoiRecord],
    ) -> Self {
        let frame_uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Params Buffer"),
            contents: bytemuck::bytes_of(&FrameParams::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let agents = vec![AgentRecord::zeroed(); capacity as usize];
        let agent_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Agent Pool Buffer"),
            contents: bytemuck::cast_slice(&agents),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        let cells = (grid_res * grid_res * grid_res) as usize;
        let grid_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Density Grid Buffer"),
            contents: bytemuck::cast_slice(&vec![0u32; cells]),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        // wgpu rejects zero-sized buffers; an empty POI list becomes one
        // zero-radius sentinel with no influence
        let poi_contents: Vec<PoiRecord> = if pois.is_empty() {
            vec![PoiRecord::zeroed()]
        } else {
            pois.to_vec()
        };
        let poi_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("POI Buffer"),
            contents: bytemuck::cast_slice(&poi_contents),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let live_counter = Counter::new(device, "Live Agents", 0);

        let influence_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("POI Influence Volume"),
            size: wgpu::Extent3d {
                width: grid_res,
                height: grid_res,
                depth_or_array_layers: grid_res,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let influence_view = influence_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let output = OutputTextureExchange::new(device, capacity, tex_width);

        Self {
            capacity,
            grid_res,
            frame_uniform,
            agent_buffer,
            grid_buffer,
            poi_buffer,
            live_counter,
            influence_texture,
            influence_view,
            output,
        }
    }

    pub fn grid_cell_count(&self) -> u32 {
        self.grid_res * self.grid_res * self.grid_res
    }

    /// Upload the per-frame parameter block. Called once per simulation frame,
    /// before the frame's command buffer is submitted.
    pub fn update_frame_params(&self, queue: &wgpu::Queue, params: &FrameParams) {
        queue.write_buffer(&self.frame_uniform, 0, bytemuck::bytes_of(params));
    }
}
