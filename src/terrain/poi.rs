//! Point-of-interest generation. POIs are pure data: a unit direction plus
//! an influence radius normalized to planet radius. How they are visualized
//! is entirely the consumer's business.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::gpu::structures::PoiRecord;
use crate::terrain::params::PlanetParams;
use crate::utils::Vec3;

/// Physical influence radius in world units before normalization.
const INFLUENCE_RADIUS_WORLD: f32 = 30.0;

pub type Poi = PoiRecord;

/// Deterministically place `count` POIs on the unit sphere for this planet.
/// The same params always yield the same list.
pub fn generate_pois(params: &PlanetParams, count: usize) -> Vec<PoiRecord> {
    let seed = params.seed as u64
        ^ ((params.noise_offset.x + params.noise_offset.y + params.noise_offset.z).to_bits()
            as u64)
            << 16;
    let mut rng = StdRng::seed_from_u64(seed);

    let radius_norm = INFLUENCE_RADIUS_WORLD / params.radius;
    (0..count)
        .map(|_| {
            let dir = random_unit_vector(&mut rng);
            PoiRecord {
                direction: dir.to_array(),
                influence_radius: radius_norm,
            }
        })
        .collect()
}

/// Uniformly distributed unit vector (rejection sampling inside the ball).
pub fn random_unit_vector(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
        );
        let len = v.length();
        if len > 1e-4 && len <= 1.0 {
            return v * (1.0 / len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_per_params() {
        let params = PlanetParams::default();
        let a = generate_pois(&params, 50);
        let b = generate_pois(&params, 50);
        assert_eq!(a.len(), 50);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.direction, y.direction);
        }
    }

    #[test]
    fn different_seeds_give_different_layouts() {
        let mut p2 = PlanetParams::default();
        p2.seed = 2222;
        let a = generate_pois(&PlanetParams::default(), 8);
        let b = generate_pois(&p2, 8);
        assert!(a.iter().zip(&b).any(|(x, y)| x.direction != y.direction));
    }

    #[test]
    fn directions_are_unit_and_radius_normalized() {
        let params = PlanetParams::default();
        for poi in generate_pois(&params, 20) {
            let len = Vec3::from(poi.direction).length();
            assert!((len - 1.0).abs() < 1e-5);
            assert!((poi.influence_radius - 30.0 / params.radius).abs() < 1e-7);
        }
    }
}
