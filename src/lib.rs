//! Conway's Game of Life simulator
//!
//! The engine works on immutable grid snapshots. A session task steps the
//! grid at a fixed cadence while running and applies caller commands in order.

pub mod config;
pub mod engine;
pub mod error;
pub mod game_of_life;
pub mod runner;
pub mod utils;

pub use config::Settings;
pub use engine::Simulation;
pub use error::SimulationError;
pub use game_of_life::{create_empty_grid, create_random_grid, step, toggle_cell, Grid};
pub use runner::{RunLoopOptions, RunState, SimulationHandle, Snapshot};

/// Spawn a session for `settings`, starting from an empty grid
pub fn spawn_session(settings: &Settings) -> (SimulationHandle, tokio::task::JoinHandle<Simulation>) {
    runner::spawn(Simulation::new(settings), RunLoopOptions::from_settings(settings))
}
