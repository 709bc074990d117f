// simulation_engine/mod.rs
pub mod simulation;
pub mod vehicles;

pub use simulation::{run_tick, SimulationEngine};
pub use vehicles::{advance_vehicle, spawn_vehicle, Fleet};
