pub mod math;

pub use math::Vec3;
