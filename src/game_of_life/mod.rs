//! Game of Life core functionality
//!
//! The free functions here are the pure engine contract: each takes a grid
//! snapshot and returns a new one.

pub mod grid;
pub mod rules;
pub mod io;

pub use grid::{Grid, NEIGHBOR_OFFSETS};
pub use rules::GameOfLifeRules;
pub use io::{load_grid_from_file, save_grid_to_file, create_example_grids};

use crate::error::SimulationError;
use rand::Rng;

/// Live probability used by `random` when nothing else is configured
pub const DEFAULT_LIVE_PROBABILITY: f64 = 0.3;

pub fn create_empty_grid(rows: usize, columns: usize) -> Grid {
    Grid::new(rows, columns)
}

/// Fails with `InvalidProbability` rather than clamping
pub fn create_random_grid<R: Rng + ?Sized>(
    rows: usize,
    columns: usize,
    live_probability: f64,
    rng: &mut R,
) -> Result<Grid, SimulationError> {
    Grid::random(rows, columns, live_probability, rng)
}

pub fn step(grid: &Grid) -> Grid {
    GameOfLifeRules::evolve(grid)
}

/// Fails with `OutOfRange` rather than clamping
pub fn toggle_cell(grid: &Grid, row: usize, col: usize) -> Result<Grid, SimulationError> {
    grid.toggled(row, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_create_empty_grid() {
        for (rows, columns) in [(1, 1), (3, 7), (30, 30)] {
            let grid = create_empty_grid(rows, columns);
            assert_eq!(grid.dimensions(), (rows, columns));
            assert!(grid.is_empty());
        }
    }

    #[test]
    fn test_step_leaves_input_unchanged() {
        let mut rng = StdRng::seed_from_u64(99);
        let grid = create_random_grid(12, 12, DEFAULT_LIVE_PROBABILITY, &mut rng).unwrap();
        let reference = grid.clone();

        let next = step(&grid);

        assert_eq!(grid, reference);
        assert_eq!(next.dimensions(), grid.dimensions());
    }

    #[test]
    fn test_toggle_round_trip_on_random_grid() {
        let mut rng = StdRng::seed_from_u64(5);
        let grid = create_random_grid(8, 6, 0.5, &mut rng).unwrap();

        for (row, col) in [(0, 0), (7, 5), (3, 2)] {
            let once = toggle_cell(&grid, row, col).unwrap();
            assert_ne!(once, grid);
            assert_eq!(toggle_cell(&once, row, col).unwrap(), grid);
        }
    }

    #[test]
    fn test_contract_violations() {
        let grid = create_empty_grid(4, 4);
        assert!(matches!(
            toggle_cell(&grid, 4, 0),
            Err(SimulationError::OutOfRange { .. })
        ));

        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            create_random_grid(4, 4, 2.0, &mut rng),
            Err(SimulationError::InvalidProbability(_))
        ));
    }

    #[test]
    fn test_neighbor_offsets_are_the_moore_neighbourhood() {
        assert_eq!(NEIGHBOR_OFFSETS.len(), 8);
        assert!(!NEIGHBOR_OFFSETS.contains(&(0, 0)));
        for dr in -1..=1 {
            for dc in -1..=1 {
                if (dr, dc) != (0, 0) {
                    assert!(NEIGHBOR_OFFSETS.contains(&(dr, dc)));
                }
            }
        }
    }
}
