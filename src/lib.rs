pub mod error;
pub mod gpu;
pub mod sim;
pub mod terrain;
pub mod utils;

pub use error::SimError;
