//! Conway's B3/S23 rule and the generation step

use super::Grid;
use rayon::prelude::*;

/// Game of Life rules engine
pub struct GameOfLifeRules;

impl GameOfLifeRules {
    /// Compute the next generation. The input grid is left untouched.
    pub fn evolve(current: &Grid) -> Grid {
        let (rows, columns) = current.dimensions();

        let next_cells: Vec<bool> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                (0..columns).into_par_iter().map(move |col| {
                    Self::should_be_alive(current.get(row, col), current.count_neighbors(row, col))
                })
            })
            .collect();

        Grid::from_raw(rows, columns, next_cells)
    }

    /// Check if a cell should be alive in the next generation given its current state and neighbor count
    pub fn should_be_alive(current_state: bool, neighbor_count: u8) -> bool {
        if !(2..=3).contains(&neighbor_count) {
            false
        } else if !current_state && neighbor_count == 3 {
            true
        } else {
            current_state
        }
    }
}
