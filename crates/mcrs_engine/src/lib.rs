pub mod math;
pub mod world;
