//! Grid representation and utilities for Game of Life

use crate::error::{check_probability, SimulationError};
use anyhow::Result;
use itertools::iproduct;
use rand::Rng;
use serde::Serialize;

/// Relative offsets of the Moore neighbourhood
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (0, -1),
];

/// An immutable Game of Life grid.
///
/// Cells are stored row-major. Every editing operation returns a new grid,
/// so a grid handed out as a snapshot never changes underneath its reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Grid {
    rows: usize,
    columns: usize,
    cells: Vec<bool>,
}

impl Grid {
    /// Create a new grid with every cell dead
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![false; rows * columns],
        }
    }

    /// Create a grid whose cells are produced by `f(row, col)`
    pub fn from_fn(rows: usize, columns: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let cells = iproduct!(0..rows, 0..columns)
            .map(|(row, col)| f(row, col))
            .collect();
        Self { rows, columns, cells }
    }

    /// Create a grid where each cell is independently alive with `live_probability`
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        columns: usize,
        live_probability: f64,
        rng: &mut R,
    ) -> Result<Self, SimulationError> {
        let p = check_probability(live_probability)?;
        Ok(Self::from_fn(rows, columns, |_, _| rng.gen_bool(p)))
    }

    /// Create a grid from a 2D boolean array
    pub fn from_cells(cells: Vec<Vec<bool>>) -> Result<Self> {
        if cells.is_empty() {
            anyhow::bail!("Grid cannot be empty");
        }

        let rows = cells.len();
        let columns = cells[0].len();

        if columns == 0 {
            anyhow::bail!("Grid width cannot be zero");
        }

        for (i, row) in cells.iter().enumerate() {
            if row.len() != columns {
                anyhow::bail!("Row {} has length {}, expected {}", i, row.len(), columns);
            }
        }

        Ok(Self {
            rows,
            columns,
            cells: cells.into_iter().flatten().collect(),
        })
    }

    pub(crate) fn from_raw(rows: usize, columns: usize, cells: Vec<bool>) -> Self {
        debug_assert_eq!(cells.len(), rows * columns);
        Self { rows, columns, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// `(rows, columns)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.columns + col
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.columns
    }

    /// Get cell value at coordinates
    pub fn get(&self, row: usize, col: usize) -> bool {
        if self.contains(row, col) {
            self.cells[self.index(row, col)]
        } else {
            false // Out of bounds cells are considered dead
        }
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<(), SimulationError> {
        if self.contains(row, col) {
            Ok(())
        } else {
            Err(SimulationError::OutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.columns,
            })
        }
    }

    /// Return a copy with cell `(row, col)` set to `value`
    pub fn with_cell(&self, row: usize, col: usize, value: bool) -> Result<Self, SimulationError> {
        self.check_bounds(row, col)?;
        let mut next = self.clone();
        let idx = next.index(row, col);
        next.cells[idx] = value;
        Ok(next)
    }

    /// Return a copy with cell `(row, col)` flipped
    pub fn toggled(&self, row: usize, col: usize) -> Result<Self, SimulationError> {
        self.with_cell(row, col, !self.get(row, col))
    }

    /// Count living neighbors for a cell. Neighbours beyond the edge count as dead.
    pub fn count_neighbors(&self, row: usize, col: usize) -> u8 {
        NEIGHBOR_OFFSETS
            .iter()
            .filter(|(dr, dc)| {
                let r = row as isize + dr;
                let c = col as isize + dc;
                r >= 0
                    && c >= 0
                    && (r as usize) < self.rows
                    && (c as usize) < self.columns
                    && self.cells[self.index(r as usize, c as usize)]
            })
            .count() as u8
    }

    /// Get all living cell coordinates
    pub fn living_cells(&self) -> Vec<(usize, usize)> {
        iproduct!(0..self.rows, 0..self.columns)
            .filter(|&(row, col)| self.get(row, col))
            .collect()
    }

    /// Count total living cells
    pub fn living_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    /// Check if the grid is empty (no living cells)
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&cell| !cell)
    }

    /// Embed this pattern in the middle of an empty `rows x columns` grid
    pub fn centered_in(&self, rows: usize, columns: usize) -> Result<Self, SimulationError> {
        if self.rows > rows || self.columns > columns {
            return Err(SimulationError::DimensionMismatch {
                expected: (rows, columns),
                actual: self.dimensions(),
            });
        }

        let row_offset = (rows - self.rows) / 2;
        let col_offset = (columns - self.columns) / 2;

        Ok(Self::from_fn(rows, columns, |row, col| {
            row >= row_offset
                && col >= col_offset
                && self.get(row - row_offset, col - col_offset)
        }))
    }
}
