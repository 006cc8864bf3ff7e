// Simulation module - agent pool, per-frame phase pipeline, output exchange
// and live-agent telemetry.
pub mod agents;
pub mod output;
pub mod pipeline;
pub mod state;

pub use agents::AgentPool;
pub use output::OutputTextureExchange;
pub use pipeline::{AgentSimulation, SimConfig};
pub use state::Counter;
