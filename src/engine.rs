//! Simulation engine: the current grid, its generation counter and the
//! transitions allowed on them

use crate::config::Settings;
use crate::error::SimulationError;
use crate::game_of_life::{self, Grid};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the grid for one session. Dimensions are fixed at construction.
///
/// Every transition swaps in a freshly built `Arc<Grid>`, so snapshots
/// handed out by [`Simulation::grid`] stay valid and consistent.
#[derive(Debug)]
pub struct Simulation {
    grid: Arc<Grid>,
    generation: u64,
    rows: usize,
    columns: usize,
    live_probability: f64,
    rng: StdRng,
}

impl Simulation {
    /// Start a session with an empty grid
    pub fn new(settings: &Settings) -> Self {
        let rows = settings.grid.rows;
        let columns = settings.grid.columns;
        let rng = match settings.random.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            grid: Arc::new(game_of_life::create_empty_grid(rows, columns)),
            generation: 0,
            rows,
            columns,
            live_probability: settings.random.live_probability,
            rng,
        }
    }

    /// Start a session from an existing grid, which must match the configured size
    pub fn with_grid(settings: &Settings, grid: Grid) -> Result<Self, SimulationError> {
        let mut simulation = Self::new(settings);
        if grid.dimensions() != (simulation.rows, simulation.columns) {
            return Err(SimulationError::DimensionMismatch {
                expected: (simulation.rows, simulation.columns),
                actual: grid.dimensions(),
            });
        }
        simulation.grid = Arc::new(grid);
        Ok(simulation)
    }

    pub fn grid(&self) -> Arc<Grid> {
        Arc::clone(&self.grid)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Advance one generation and return the new counter value
    pub fn step(&mut self) -> u64 {
        self.grid = Arc::new(game_of_life::step(&self.grid));
        self.generation += 1;
        debug!(generation = self.generation, live = self.grid.living_count(), "stepped");
        self.generation
    }

    pub fn clear(&mut self) {
        self.grid = Arc::new(game_of_life::create_empty_grid(self.rows, self.columns));
        self.generation = 0;
        info!("grid cleared");
    }

    /// Randomize with the configured live probability
    pub fn randomize(&mut self) -> Result<(), SimulationError> {
        self.randomize_with(self.live_probability)
    }

    /// Randomize with an explicit live probability. The state is untouched on error.
    pub fn randomize_with(&mut self, live_probability: f64) -> Result<(), SimulationError> {
        let grid = game_of_life::create_random_grid(
            self.rows,
            self.columns,
            live_probability,
            &mut self.rng,
        )?;
        self.grid = Arc::new(grid);
        self.generation = 0;
        info!(live_probability, live = self.grid.living_count(), "grid randomized");
        Ok(())
    }

    /// Flip one cell. The state is untouched on error.
    pub fn toggle_cell(&mut self, row: usize, col: usize) -> Result<(), SimulationError> {
        let grid = game_of_life::toggle_cell(&self.grid, row, col)?;
        self.grid = Arc::new(grid);
        debug!(row, col, alive = self.grid.get(row, col), "cell toggled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_settings(rows: usize, columns: usize) -> Settings {
        let mut settings = Settings::default();
        settings.grid.rows = rows;
        settings.grid.columns = columns;
        settings.random.seed = Some(1234);
        settings
    }

    #[test]
    fn test_new_session_is_empty() {
        let sim = Simulation::new(&Settings::default());
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.grid().dimensions(), (30, 30));
        assert!(sim.grid().is_empty());
    }

    #[test]
    fn test_step_increments_generation_by_one() {
        let mut sim = Simulation::new(&seeded_settings(10, 10));
        sim.randomize().unwrap();

        assert_eq!(sim.step(), 1);
        assert_eq!(sim.step(), 2);
        assert_eq!(sim.generation(), 2);
    }

    #[test]
    fn test_snapshot_survives_later_steps() {
        let mut sim = Simulation::new(&seeded_settings(5, 5));
        sim.toggle_cell(2, 1).unwrap();
        sim.toggle_cell(2, 2).unwrap();
        sim.toggle_cell(2, 3).unwrap();

        let before = sim.grid();
        sim.step();

        assert_eq!(before.living_cells(), vec![(2, 1), (2, 2), (2, 3)]);
        assert_eq!(sim.grid().living_cells(), vec![(1, 2), (2, 2), (3, 2)]);
    }

    #[test]
    fn test_clear_and_randomize_reset_generation() {
        let mut sim = Simulation::new(&seeded_settings(8, 8));
        sim.randomize().unwrap();
        sim.step();
        sim.step();

        sim.clear();
        assert_eq!(sim.generation(), 0);
        assert!(sim.grid().is_empty());

        sim.step();
        sim.randomize().unwrap();
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.grid().dimensions(), (8, 8));
    }

    #[test]
    fn test_toggle_does_not_touch_generation() {
        let mut sim = Simulation::new(&seeded_settings(4, 4));
        sim.step();
        sim.toggle_cell(0, 0).unwrap();
        assert_eq!(sim.generation(), 1);
        assert!(sim.grid().get(0, 0));
    }

    #[test]
    fn test_rejected_operations_leave_state_untouched() {
        let mut sim = Simulation::new(&seeded_settings(4, 4));
        sim.toggle_cell(1, 1).unwrap();
        sim.step();
        let grid = sim.grid();

        assert!(sim.toggle_cell(4, 1).is_err());
        assert!(sim.randomize_with(1.01).is_err());
        assert!(sim.randomize_with(f64::NAN).is_err());

        assert_eq!(*sim.grid(), *grid);
        assert_eq!(sim.generation(), 1);
    }

    #[test]
    fn test_seeded_sessions_randomize_identically() {
        let mut a = Simulation::new(&seeded_settings(16, 16));
        let mut b = Simulation::new(&seeded_settings(16, 16));
        a.randomize().unwrap();
        b.randomize().unwrap();
        assert_eq!(a.grid(), b.grid());
    }

    #[test]
    fn test_with_grid_checks_dimensions() {
        let settings = seeded_settings(5, 5);
        let grid = Grid::new(5, 5).toggled(0, 0).unwrap();

        let sim = Simulation::with_grid(&settings, grid).unwrap();
        assert!(sim.grid().get(0, 0));

        assert_eq!(
            Simulation::with_grid(&settings, Grid::new(3, 5)).unwrap_err(),
            SimulationError::DimensionMismatch { expected: (5, 5), actual: (3, 5) }
        );
    }
}
