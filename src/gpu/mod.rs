// GPU module - manages the device, POD layouts, buffers, pipelines and
// WGSL kernel sources.
pub mod buffers;
pub mod device;
pub mod pipelines;
pub mod readback;
pub mod structures;
pub mod uniforms;
pub mod wgsl;

pub use device::GpuDevice;
