//! Blocking GPU-to-CPU copies. Every call here forces a pipeline
//! synchronization, so these are reserved for bake results, teardown-time
//! inspection and throttled debug paths - never the per-frame hot loop.

use std::sync::mpsc;

use crate::error::SimError;

/// Copy `size` bytes from `src` at `offset` into a fresh staging buffer and
/// block until the mapping completes.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Buffer,
    offset: u64,
    size: u64,
) -> Result<Vec<u8>, SimError> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(src, offset, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    map_and_copy(device, &staging)
}

/// Copy a 2-D array texture (all layers) of `texel_size`-byte texels into a
/// tightly packed byte vector, stripping the 256-byte row padding wgpu
/// requires for texture-to-buffer copies.
pub fn read_texture_layers(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
    layers: u32,
    texel_size: u32,
) -> Result<Vec<u8>, SimError> {
    let unpadded_row = width * texel_size;
    let padded_row = unpadded_row.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let size = padded_row as u64 * height as u64 * layers as u64;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Texture Readback Staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Texture Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let padded = map_and_copy(device, &staging)?;

    if padded_row == unpadded_row {
        return Ok(padded);
    }
    let mut packed = Vec::with_capacity((unpadded_row as usize) * (height * layers) as usize);
    for row in 0..(height * layers) as usize {
        let start = row * padded_row as usize;
        packed.extend_from_slice(&padded[start..start + unpadded_row as usize]);
    }
    Ok(packed)
}

fn map_and_copy(device: &wgpu::Device, staging: &wgpu::Buffer) -> Result<Vec<u8>, SimError> {
    let slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    loop {
        let _ = device.poll(wgpu::MaintainBase::Wait);
        match receiver.try_recv() {
            Ok(Ok(())) => break,
            Ok(Err(e)) => return Err(SimError::Readback(format!("mapping failed: {e:?}"))),
            Err(mpsc::TryRecvError::Empty) => {
                std::thread::sleep(std::time::Duration::from_micros(100));
            }
            Err(mpsc::TryRecvError::Disconnected) => {
                return Err(SimError::Readback("map channel disconnected".into()));
            }
        }
    }

    let mapped = slice.get_mapped_range();
    let data = mapped.to_vec();
    drop(mapped);
    staging.unmap();
    Ok(data)
}
