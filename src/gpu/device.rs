use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};

use crate::error::SimError;

/// Headless compute device. Owns the wgpu device/queue pair used by every
/// bake and simulation instance, plus a sticky flag recording any uncaptured
/// device error so running simulations can disable themselves.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    device_lost: Arc<AtomicBool>,
}

impl GpuDevice {
    pub fn new() -> Result<Self, SimError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(SimError::NoAdapter)?;

        info!("using adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Simulation Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))?;

        let device_lost = Arc::new(AtomicBool::new(false));
        let flag = device_lost.clone();
        device.on_uncaptured_error(Box::new(move |e| {
            error!("uncaptured device error: {e}");
            flag.store(true, Ordering::Relaxed);
        }));

        Ok(Self { device, queue, device_lost })
    }

    /// True once any uncaptured error has been reported for this device.
    /// Simulations poll this each frame and permanently disable on loss.
    pub fn is_lost(&self) -> bool {
        self.device_lost.load(Ordering::Relaxed)
    }
}
