//! CPU terrain height evaluator.
//!
//! The arithmetic here is mirrored operation-for-operation by the WGSL
//! evaluator in `gpu/wgsl/terrain_bake.wgsl`; any change to one side must be
//! made to both. CPU and GPU results agree within 1e-3 relative tolerance
//! (f32 rounding differs across drivers, the formulas do not).

use crate::terrain::params::PlanetParams;
use crate::utils::math::smoothstep;
use crate::utils::Vec3;

#[derive(Debug, Clone, Copy)]
struct V4 {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

impl V4 {
    fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    fn add(self, o: V4) -> V4 {
        V4::new(self.x + o.x, self.y + o.y, self.z + o.z, self.w + o.w)
    }

    fn sub(self, o: V4) -> V4 {
        V4::new(self.x - o.x, self.y - o.y, self.z - o.z, self.w - o.w)
    }

    fn mul(self, o: V4) -> V4 {
        V4::new(self.x * o.x, self.y * o.y, self.z * o.z, self.w * o.w)
    }

    fn scale(self, s: f32) -> V4 {
        V4::new(self.x * s, self.y * s, self.z * s, self.w * s)
    }

    fn floor(self) -> V4 {
        V4::new(self.x.floor(), self.y.floor(), self.z.floor(), self.w.floor())
    }

    fn abs(self) -> V4 {
        V4::new(self.x.abs(), self.y.abs(), self.z.abs(), self.w.abs())
    }

    fn max_scalar(self, s: f32) -> V4 {
        V4::new(self.x.max(s), self.y.max(s), self.z.max(s), self.w.max(s))
    }

    /// GLSL `step(edge, x)` per component.
    fn step(edge: V4, x: V4) -> V4 {
        V4::new(
            if x.x >= edge.x { 1.0 } else { 0.0 },
            if x.y >= edge.y { 1.0 } else { 0.0 },
            if x.z >= edge.z { 1.0 } else { 0.0 },
            if x.w >= edge.w { 1.0 } else { 0.0 },
        )
    }
}

fn mod289_v3(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn mod289_v4(x: V4) -> V4 {
    x.sub(x.scale(1.0 / 289.0).floor().scale(289.0))
}

fn permute(x: V4) -> V4 {
    mod289_v4(x.scale(34.0).add(V4::splat(1.0)).mul(x))
}

fn taylor_inv_sqrt(r: V4) -> V4 {
    V4::splat(1.79284291400159).sub(r.scale(0.85373472095314))
}

/// 3-D simplex noise, output roughly in [-1, 1].
pub fn snoise(v: Vec3) -> f32 {
    let c = (1.0 / 6.0, 1.0 / 3.0);
    let d = V4::new(0.0, 0.5, 1.0, 2.0);

    // First corner
    let mut i = (v + Vec3::splat(v.dot(Vec3::splat(c.1)))).floor();
    let x0 = v - i + Vec3::splat(i.dot(Vec3::splat(c.0)));

    // Other corners
    let g = Vec3::step(x0.yzx(), x0);
    let l = Vec3::splat(1.0) - g;
    let i1 = g.min(l.zxy());
    let i2 = g.max(l.zxy());

    let x1 = x0 - i1 + Vec3::splat(c.0);
    let x2 = x0 - i2 + Vec3::splat(c.1);
    let x3 = x0 - Vec3::splat(d.y);

    // Permutations
    i = mod289_v3(i);
    let p = permute(
        permute(
            permute(V4::splat(i.z).add(V4::new(0.0, i1.z, i2.z, 1.0)))
                .add(V4::splat(i.y))
                .add(V4::new(0.0, i1.y, i2.y, 1.0)),
        )
        .add(V4::splat(i.x))
        .add(V4::new(0.0, i1.x, i2.x, 1.0)),
    );

    // Gradients: 7x7 points over a square, mapped onto an octahedron
    let n_ = 0.142857142857f32;
    let ns = Vec3::new(d.w, d.y, d.z) * n_ - Vec3::new(d.x, d.z, d.x);

    let j = p.sub(p.scale(ns.z * ns.z).floor().scale(49.0));

    let x_ = j.scale(ns.z).floor();
    let y_ = j.sub(x_.scale(7.0)).floor();

    let x = x_.scale(ns.x).add(V4::splat(ns.y));
    let y = y_.scale(ns.x).add(V4::splat(ns.y));

    let h = V4::splat(1.0).sub(x.abs()).sub(y.abs());

    let b0 = V4::new(x.x, x.y, y.x, y.y);
    let b1 = V4::new(x.z, x.w, y.z, y.w);

    let s0 = b0.floor().scale(2.0).add(V4::splat(1.0));
    let s1 = b1.floor().scale(2.0).add(V4::splat(1.0));

    let sh = V4::step(h, V4::splat(0.0)).scale(-1.0);

    let a0 = V4::new(b0.x, b0.z, b0.y, b0.w)
        .add(V4::new(s0.x, s0.z, s0.y, s0.w).mul(V4::new(sh.x, sh.x, sh.y, sh.y)));
    let a1 = V4::new(b1.x, b1.z, b1.y, b1.w)
        .add(V4::new(s1.x, s1.z, s1.y, s1.w).mul(V4::new(sh.z, sh.z, sh.w, sh.w)));

    let mut p0 = Vec3::new(a0.x, a0.y, h.x);
    let mut p1 = Vec3::new(a0.z, a0.w, h.y);
    let mut p2 = Vec3::new(a1.x, a1.y, h.z);
    let mut p3 = Vec3::new(a1.z, a1.w, h.w);

    // Normalise gradients
    let norm = taylor_inv_sqrt(V4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 = p0 * norm.x;
    p1 = p1 * norm.y;
    p2 = p2 * norm.z;
    p3 = p3 * norm.w;

    let m = V4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3))
        .scale(-1.0)
        .add(V4::splat(0.6))
        .max_scalar(0.0);
    let m = m.mul(m);

    42.0 * (m.x * m.x * p0.dot(x0)
        + m.y * m.y * p1.dot(x1)
        + m.z * m.z * p2.dot(x2)
        + m.w * m.w * p3.dot(x3))
}

/// Fractal sum, persistence 0.5, lacunarity 2.0, shifted each octave.
pub fn fbm(p: Vec3, octaves: u32) -> f32 {
    let mut p = p;
    let mut v = 0.0f32;
    let mut a = 0.5f32;
    let mut freq = 1.0f32;
    let shift = Vec3::splat(100.0);
    for _ in 0..octaves {
        v += a * snoise(p * freq);
        p += shift;
        a *= 0.5;
        freq *= 2.0;
    }
    v
}

/// Ridged multifractal: fold around zero, sharpen, weight by the previous
/// octave so ridges break up instead of stacking uniformly.
pub fn ridged(p: Vec3, octaves: u32, sharpness: f32) -> f32 {
    let mut v = 0.0f32;
    let mut a = 1.0f32;
    let mut freq = 1.0f32;
    let mut prev = 1.0f32;
    for _ in 0..octaves {
        let folded = 1.0 - snoise(p * freq).abs();
        let n = folded.max(0.0).powf(sharpness);
        v += n * a * prev;
        prev = n;
        a *= 0.5;
        freq *= 2.0;
    }
    v
}

/// Offset vector from three independent low-frequency fractal evaluations.
pub fn warp(p: Vec3, strength: f32) -> Vec3 {
    let q = Vec3::new(
        fbm(p * 0.5, 2),
        fbm(p * 0.5 + Vec3::new(5.2, 1.3, 2.8), 2),
        fbm(p * 0.5 + Vec3::new(9.2, 8.3, 2.1), 2),
    );
    p + q * strength
}

/// Terrain height above the base radius for a unit direction, in
/// [0, noise_height]. Pure and deterministic.
pub fn height(dir: Vec3, params: &PlanetParams) -> f32 {
    let p = dir.normalized() * params.noise_scale + params.noise_offset;
    let w = warp(p, params.warp_strength);

    let continental = fbm(w * 0.5, 5);
    let mountain_density = fbm(w * 0.5 + Vec3::splat(40.0), 4);
    let ridged_detail = ridged(w * params.detail_frequency, 4, params.ridge_sharpness);
    let ground_detail = fbm(w * params.ground_detail_freq, 2) * 0.05;

    let h = if continental < params.ocean_floor_level {
        continental + ground_detail
    } else {
        let mask = smoothstep(params.mask_start, params.mask_end, mountain_density);
        let detail = ground_detail + (ridged_detail * 0.5 - ground_detail) * mask;
        continental + detail * params.weight_multiplier
    };

    (h * 0.5 + 0.5).clamp(0.0, 1.0) * params.noise_height
}

/// Distance from planet center to the surface along `dir`.
pub fn surface_radius(dir: Vec3, params: &PlanetParams) -> f32 {
    params.radius + height(dir, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dirs() -> Vec<Vec3> {
        let mut dirs = Vec::new();
        for ix in -2..=2 {
            for iy in -2..=2 {
                for iz in -2..=2 {
                    let v = Vec3::new(ix as f32, iy as f32, iz as f32 + 0.5);
                    if v.length() > 0.1 {
                        dirs.push(v.normalized());
                    }
                }
            }
        }
        dirs
    }

    #[test]
    fn snoise_is_deterministic_and_bounded() {
        for dir in sample_dirs() {
            let p = dir * 3.7;
            let a = snoise(p);
            let b = snoise(p);
            assert_eq!(a.to_bits(), b.to_bits());
            assert!(a.abs() < 1.1, "snoise out of range: {a} at {p:?}");
        }
    }

    #[test]
    fn height_is_deterministic_and_within_amplitude() {
        let params = PlanetParams::default();
        for dir in sample_dirs() {
            let a = height(dir, &params);
            let b = height(dir, &params);
            assert_eq!(a.to_bits(), b.to_bits());
            assert!(a >= 0.0 && a <= params.noise_height);
        }
    }

    #[test]
    fn height_varies_across_the_sphere() {
        let params = PlanetParams::default();
        let dirs = sample_dirs();
        let first = height(dirs[0], &params);
        assert!(
            dirs.iter().any(|d| (height(*d, &params) - first).abs() > 1e-3),
            "height field is constant"
        );
    }

    #[test]
    fn zero_warp_strength_leaves_domain_unchanged() {
        let p = Vec3::new(0.3, -1.2, 4.5);
        assert_eq!(warp(p, 0.0), p);
    }

    #[test]
    fn surface_radius_offsets_by_base_radius() {
        let params = PlanetParams::default();
        let dir = Vec3::new(0.0, 1.0, 0.0);
        let r = surface_radius(dir, &params);
        assert!(r >= params.radius && r <= params.max_surface_radius());
    }
}
