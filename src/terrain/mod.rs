// Terrain synthesis - planet parameters, CPU noise evaluator, cube-map
// baking and point-of-interest generation.
pub mod baker;
pub mod cubemap;
pub mod noise;
pub mod params;
pub mod poi;

pub use baker::{BakeResult, TerrainBaker};
pub use cubemap::HeightField;
pub use params::PlanetParams;
pub use poi::{generate_pois, Poi};
