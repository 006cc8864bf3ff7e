use thiserror::Error;

/// Errors surfaced by GPU setup, terrain baking and simulation construction.
///
/// Per-frame entry points never return errors; a failed or lost instance
/// disables itself and turns its entry points into no-ops instead.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("shader or pipeline validation failed: {0}")]
    PipelineValidation(String),

    #[error("invalid planet parameters: {0}")]
    InvalidParams(String),

    #[error("GPU readback failed: {0}")]
    Readback(String),
}
