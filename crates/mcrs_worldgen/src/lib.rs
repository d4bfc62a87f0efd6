pub mod aquifer;
pub mod biome;
pub mod chunk;
pub mod climate;
pub mod density_function;
pub mod error;
pub mod generator;
pub mod noise;
pub mod preset;
pub mod proto;
pub mod random_state;
pub mod router;
pub mod spline;
pub mod surface;
