// GPU structures for agents, terrain reduction and points of interest -
// layouts mirror the WGSL structs exactly.
use bytemuck::{self, Pod, Zeroable};

/// Agent status codes, stored in `color[3]`.
pub const STATUS_DEAD: f32 = 0.0;
pub const STATUS_ALIVE: f32 = 1.0;
pub const STATUS_ARRIVED: f32 = 2.0;

/// Fixed-point scale for the integer atomic min/max height reduction.
pub const FIXED_POINT_SCALE: f32 = 100000.0;

/// One pool slot, 80 bytes. All slots start zeroed, i.e. Dead.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct AgentRecord {
    /// (x, y, z, display radius)
    pub position: [f32; 4],
    /// (x, y, z, max speed)
    pub velocity: [f32; 4],
    /// (x, y, z, arrival cosine threshold)
    pub target: [f32; 4],
    /// (r, g, b, status)
    pub color: [f32; 4],
    /// (team id, spawn time, arrive time, reserved)
    pub meta: [f32; 4],
}

impl AgentRecord {
    pub const SIZE: u64 = std::mem::size_of::<AgentRecord>() as u64;

    pub fn status(&self) -> f32 {
        self.color[3]
    }

    pub fn is_alive(&self) -> bool {
        self.color[3] == STATUS_ALIVE
    }
}

/// Fixed-point min/max accumulator folded by the bake kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BakeStats {
    pub min_q: i32,
    pub max_q: i32,
}

impl BakeStats {
    /// Identity element: any observed height tightens both bounds.
    pub fn identity() -> Self {
        Self { min_q: i32::MAX, max_q: i32::MIN }
    }
}

/// Point of interest: unit direction plus influence radius normalized to
/// planet radius. Read-only to the simulation.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PoiRecord {
    pub direction: [f32; 3],
    pub influence_radius: f32,
}

/// Encode a height for the integer atomic reduction.
pub fn quantize_height(h: f32) -> i32 {
    (h * FIXED_POINT_SCALE).round() as i32
}

/// Decode a reduced fixed-point height back to float.
pub fn dequantize_height(q: i32) -> f32 {
    q as f32 / FIXED_POINT_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_record_is_80_bytes_of_vec4_lanes() {
        assert_eq!(std::mem::size_of::<AgentRecord>(), 80);
        assert_eq!(AgentRecord::SIZE % 16, 0);
    }

    #[test]
    fn zeroed_record_is_dead() {
        let r = AgentRecord::zeroed();
        assert_eq!(r.status(), STATUS_DEAD);
        assert!(!r.is_alive());
    }

    #[test]
    fn fixed_point_round_trip_within_epsilon() {
        for h in [0.0f32, 0.33333, 1.0, 42.424242, 69.99999, -3.5] {
            let back = dequantize_height(quantize_height(h));
            assert!(
                (back - h).abs() <= 0.5 / FIXED_POINT_SCALE + 1e-6,
                "{h} decoded to {back}"
            );
        }
    }

    #[test]
    fn stats_identity_absorbs_first_sample() {
        let id = BakeStats::identity();
        let q = quantize_height(12.5);
        assert!(q < id.min_q);
        assert!(q > id.max_q);
    }
}
