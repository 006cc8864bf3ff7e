//! Fixed-capacity agent pool with a CPU-issued spawn/overwrite protocol.
//!
//! The pool keeps a CPU mirror of every record it has written. Spawning
//! overwrites one slot and uploads only that record's byte range; slots are
//! never individually freed, only overwritten. The mirror reflects
//! spawn-time state - GPU-side deaths and arrivals are not folded back in
//! unless `refresh` is called with a debug readback.

use bytemuck::Zeroable;
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::gpu::structures::{AgentRecord, STATUS_ALIVE};
use crate::terrain::noise;
use crate::terrain::params::PlanetParams;
use crate::terrain::poi::random_unit_vector;
use crate::utils::Vec3;

pub const DEFAULT_MAX_SPEED: f32 = 8.0;
pub const DEFAULT_DISPLAY_RADIUS: f32 = 0.5;
/// Arrival threshold meaning "no target": cosines never reach it.
pub const NO_TARGET: f32 = 2.0;

/// Angular spread of team spawn clusters around their pole.
const TEAM_SPREAD: f32 = 0.3;
const TEAM_COLORS: [[f32; 3]; 2] = [[0.0, 0.5, 1.0], [1.0, 0.2, 0.0]];

pub struct AgentPool {
    records: Vec<AgentRecord>,
    cursor: usize,
    rng: StdRng,
    params: PlanetParams,
}

impl AgentPool {
    pub fn new(capacity: u32, params: PlanetParams) -> Self {
        Self {
            records: vec![AgentRecord::zeroed(); capacity as usize],
            cursor: 0,
            rng: StdRng::seed_from_u64(params.seed as u64),
            params,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn records(&self) -> &[AgentRecord] {
        &self.records
    }

    /// Slots the CPU mirror believes are alive.
    pub fn alive_count(&self) -> u32 {
        self.records.iter().filter(|r| r.is_alive()).count() as u32
    }

    /// Replace the mirror with records read back from the GPU.
    pub fn refresh(&mut self, records: &[AgentRecord]) {
        debug_assert_eq!(records.len(), self.records.len());
        self.records.copy_from_slice(records);
    }

    /// A fresh Alive record: given position, zero velocity, neutral group
    /// data, no target.
    fn fresh_record(position: Vec3) -> AgentRecord {
        AgentRecord {
            position: [position.x, position.y, position.z, DEFAULT_DISPLAY_RADIUS],
            velocity: [0.0, 0.0, 0.0, DEFAULT_MAX_SPEED],
            target: [0.0, 0.0, 0.0, NO_TARGET],
            color: [1.0, 1.0, 1.0, STATUS_ALIVE],
            meta: [0.0; 4],
        }
    }

    /// Overwrite the mirror at `slot` and return the byte offset of that
    /// record in the GPU buffer. Pure CPU half of the spawn protocol.
    fn stage(&mut self, slot: u32, record: AgentRecord) -> u64 {
        self.records[slot as usize] = record;
        slot as u64 * AgentRecord::SIZE
    }

    fn upload(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer, slot: u32, offset: u64) {
        queue.write_buffer(
            buffer,
            offset,
            bytemuck::bytes_of(&self.records[slot as usize]),
        );
    }

    /// Overwrite `slot` with a fresh Alive record at `position`, uploading
    /// only that record's byte range. Out-of-range slots are rejected.
    pub fn spawn(
        &mut self,
        queue: &wgpu::Queue,
        buffer: &wgpu::Buffer,
        position: Vec3,
        slot: u32,
    ) {
        if slot >= self.capacity() {
            warn!("spawn rejected: slot {slot} outside capacity {}", self.capacity());
            return;
        }
        let offset = self.stage(slot, Self::fresh_record(position));
        self.upload(queue, buffer, slot, offset);
    }

    /// Spawn up to `count` agents at seeded random surface points, scanning
    /// slots round-robin for any not currently Alive. Returns how many
    /// actually spawned.
    pub fn spawn_many(&mut self, queue: &wgpu::Queue, buffer: &wgpu::Buffer, count: u32) -> u32 {
        let capacity = self.capacity() as usize;
        let mut spawned = 0;
        for _ in 0..capacity {
            if spawned == count {
                break;
            }
            let slot = self.cursor;
            self.cursor = (self.cursor + 1) % capacity;
            if self.records[slot].is_alive() {
                continue;
            }
            let dir = random_unit_vector(&mut self.rng);
            let position = dir * noise::surface_radius(dir, &self.params);
            let offset = self.stage(slot as u32, Self::fresh_record(position));
            self.upload(queue, buffer, slot as u32, offset);
            spawned += 1;
        }
        spawned
    }

    /// Two opposing teams clustered around the Y poles, each targeting the
    /// other's pole. Fills slots [0, 2 * per_team) in order.
    pub fn spawn_teams(
        &mut self,
        queue: &wgpu::Queue,
        buffer: &wgpu::Buffer,
        per_team: u32,
        max_speed: f32,
        arrive_cos: f32,
    ) -> u32 {
        let total = (per_team * 2).min(self.capacity());
        for i in 0..total {
            let team = (i / per_team) as usize;
            let pole = if team == 0 {
                Vec3::new(0.0, 1.0, 0.0)
            } else {
                Vec3::new(0.0, -1.0, 0.0)
            };
            let target = -pole;

            // Cosine-weighted cluster around the pole
            let ox = self.rng.gen_range(-TEAM_SPREAD..TEAM_SPREAD);
            let oz = self.rng.gen_range(-TEAM_SPREAD..TEAM_SPREAD);
            let dir = (pole + Vec3::new(ox, 0.0, oz)).normalized();
            let position = dir * noise::surface_radius(dir, &self.params);

            let color = TEAM_COLORS[team];
            let record = AgentRecord {
                position: [position.x, position.y, position.z, DEFAULT_DISPLAY_RADIUS],
                velocity: [0.0, 0.0, 0.0, max_speed],
                target: [target.x, target.y, target.z, arrive_cos],
                color: [color[0], color[1], color[2], STATUS_ALIVE],
                meta: [team as f32, 0.0, 0.0, 0.0],
            };
            let offset = self.stage(i, record);
            self.upload(queue, buffer, i, offset);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::structures::STATUS_DEAD;

    fn pool(capacity: u32) -> AgentPool {
        AgentPool::new(capacity, PlanetParams::default())
    }

    #[test]
    fn all_slots_start_dead() {
        let p = pool(16);
        assert_eq!(p.alive_count(), 0);
        assert!(p.records().iter().all(|r| r.status() == STATUS_DEAD));
    }

    #[test]
    fn staging_twice_leaves_exactly_the_second_record() {
        let mut p = pool(8);
        let first = AgentPool::fresh_record(Vec3::new(1.0, 0.0, 0.0));
        let second = AgentPool::fresh_record(Vec3::new(0.0, 2.0, 0.0));
        p.stage(3, first);
        p.stage(3, second);
        assert_eq!(p.records()[3].position, second.position);
        assert_eq!(p.alive_count(), 1);
    }

    #[test]
    fn staging_one_slot_never_touches_others() {
        let mut p = pool(8);
        let before: Vec<_> = p.records().to_vec();
        p.stage(5, AgentPool::fresh_record(Vec3::new(0.0, 1.0, 0.0)));
        for (i, (a, b)) in p.records().iter().zip(&before).enumerate() {
            if i != 5 {
                assert_eq!(a.position, b.position, "slot {i} mutated");
                assert_eq!(a.color, b.color, "slot {i} mutated");
            }
        }
    }

    #[test]
    fn stage_offset_is_record_aligned() {
        let mut p = pool(8);
        let off = p.stage(4, AgentRecord::zeroed());
        assert_eq!(off, 4 * AgentRecord::SIZE);
    }

    #[test]
    fn fresh_record_is_neutral_and_alive() {
        let r = AgentPool::fresh_record(Vec3::new(0.0, 10.0, 0.0));
        assert!(r.is_alive());
        assert_eq!(&r.velocity[..3], &[0.0, 0.0, 0.0]);
        assert_eq!(r.target[3], NO_TARGET);
        assert_eq!(r.meta, [0.0; 4]);
    }
}
