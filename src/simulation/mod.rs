pub mod states;
pub mod params;
pub mod engine;
pub mod image;
pub mod classifier;
pub mod forces;
pub mod compute;
pub mod integrator;
pub mod body;
pub mod scenario;
