use std::sync::mpsc;

use log::warn;
use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use crate::error::SimError;
use crate::gpu::readback;

/// Where the staging buffer is in its copy/map/read cycle. The latest
/// successfully read value travels with the state so one lock guards both.
enum ReadPhase {
    Idle,
    CopyQueued,
    Mapping(mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>),
}

struct ReadCycle {
    phase: ReadPhase,
    last_value: u32,
}

/// GPU atomic counter with a non-blocking readback cycle. The hot path never
/// stalls on the GPU: `try_read` returns the freshest value that has finished
/// mapping, lagging the simulation by a frame or two.
pub struct Counter {
    pub buffer: wgpu::Buffer,
    staging: wgpu::Buffer,
    cycle: Mutex<ReadCycle>,
}

impl Counter {
    pub fn new(device: &wgpu::Device, label: &str, initial_value: u32) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Counter")),
            contents: bytemuck::cast_slice(&[initial_value]),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Counter Staging")),
            size: std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            staging,
            cycle: Mutex::new(ReadCycle {
                phase: ReadPhase::Idle,
                last_value: initial_value,
            }),
        }
    }

    pub fn get_last(&self) -> u32 {
        self.cycle.lock().last_value
    }

    /// Call while encoding commands for frame N; a no-op if the previous
    /// cycle has not finished.
    pub fn schedule_copy_if_idle(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut cycle = self.cycle.lock();
        if matches!(cycle.phase, ReadPhase::Idle) {
            encoder.copy_buffer_to_buffer(&self.buffer, 0, &self.staging, 0, 4);
            cycle.phase = ReadPhase::CopyQueued;
        }
    }

    /// Call AFTER queue.submit, while polling every frame.
    pub fn begin_map_if_ready(&self) {
        let mut cycle = self.cycle.lock();
        if !matches!(cycle.phase, ReadPhase::CopyQueued) {
            return;
        }

        let (sender, receiver) = mpsc::channel();
        self.staging
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |res| {
                let _ = sender.send(res);
            });
        cycle.phase = ReadPhase::Mapping(receiver);
    }

    /// Call after device.poll. Returns the newest value if the mapping
    /// completed; otherwise the last known value.
    pub fn try_read(&self) -> u32 {
        let mut cycle = self.cycle.lock();

        let ReadPhase::Mapping(rx) = &cycle.phase else {
            return cycle.last_value;
        };

        match rx.try_recv() {
            Ok(Ok(())) => {
                let mapped = self.staging.slice(..).get_mapped_range();
                let val = *bytemuck::from_bytes::<u32>(&mapped[..4]);
                drop(mapped);
                self.staging.unmap();

                cycle.last_value = val;
                cycle.phase = ReadPhase::Idle;
                val
            }
            Ok(Err(e)) => {
                warn!("counter readback mapping failed: {e:?}");
                self.staging.unmap();
                cycle.phase = ReadPhase::Idle;
                cycle.last_value
            }
            Err(mpsc::TryRecvError::Empty) => cycle.last_value,
            Err(mpsc::TryRecvError::Disconnected) => {
                warn!("counter readback channel disconnected");
                cycle.phase = ReadPhase::Idle;
                cycle.last_value
            }
        }
    }

    /// Synchronous read of the live value. Stalls the pipeline; used by tests
    /// and teardown paths, never the per-frame loop.
    pub fn read_blocking(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<u32, SimError> {
        // The async staging buffer may be mid-map; use an independent copy
        let bytes = readback::read_buffer(device, queue, &self.buffer, 0, 4)?;
        let val = *bytemuck::from_bytes::<u32>(&bytes);
        self.cycle.lock().last_value = val;
        Ok(val)
    }
}
