//! CPU-side cube-map addressing and height sampling.
//!
//! `face_direction` / `direction_to_face_uv` are exact mirrors of the WGSL
//! versions in the bake and agent kernels; the round trip between them is
//! what lets the CPU query the same texel the GPU wrote.

use crate::utils::Vec3;

/// Map a face index and face UV in [-1, 1] to an unnormalized direction.
pub fn face_direction(face: u32, u: f32, v: f32) -> Vec3 {
    match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    }
}

/// Major-axis face selection; returns (face, u01, v01) with UVs in [0, 1].
pub fn direction_to_face_uv(dir: Vec3) -> (u32, f32, f32) {
    let a = dir.abs();
    let (face, u, v) = if a.x >= a.y && a.x >= a.z {
        if dir.x > 0.0 {
            (0, -dir.z / a.x, -dir.y / a.x)
        } else {
            (1, dir.z / a.x, -dir.y / a.x)
        }
    } else if a.y >= a.z {
        if dir.y > 0.0 {
            (2, dir.x / a.y, dir.z / a.y)
        } else {
            (3, dir.x / a.y, -dir.z / a.y)
        }
    } else if dir.z > 0.0 {
        (4, dir.x / a.z, -dir.y / a.z)
    } else {
        (5, -dir.x / a.z, -dir.y / a.z)
    };
    (face, u * 0.5 + 0.5, v * 0.5 + 0.5)
}

/// CPU copy of the baked height cube, for surface queries without a GPU
/// round trip.
pub struct HeightField {
    resolution: u32,
    /// 6 * resolution^2 texels, face-major, row-major within a face.
    data: Vec<f32>,
}

impl HeightField {
    pub fn from_bytes(resolution: u32, bytes: &[u8]) -> Self {
        let data = bytemuck::cast_slice::<u8, f32>(bytes).to_vec();
        debug_assert_eq!(data.len(), (6 * resolution * resolution) as usize);
        Self { resolution, data }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Nearest-texel height lookup by direction, matching the agent kernel's
    /// `sample_height`.
    pub fn sample(&self, dir: Vec3) -> f32 {
        let (face, u01, v01) = direction_to_face_uv(dir);
        let res = self.resolution as i64;
        let x = ((u01 * res as f32) as i64).clamp(0, res - 1);
        let y = ((v01 * res as f32) as i64).clamp(0, res - 1);
        let idx = face as i64 * res * res + y * res + x;
        self.data[idx as usize]
    }

    /// All texels, for full-field scans.
    pub fn texels(&self) -> &[f32] {
        &self.data
    }
}
