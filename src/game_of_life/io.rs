//! Plain-text pattern files

use super::Grid;
use anyhow::{Context, Result};
use std::path::Path;

/// Load a grid from a text file
/// Format: Each line represents a row, with '1' for alive cells and '0' for dead cells
pub fn load_grid_from_file<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read grid file: {}", path.as_ref().display()))?;

    parse_grid_from_string(&content)
        .with_context(|| format!("Failed to parse grid from file: {}", path.as_ref().display()))
}

/// Parse a grid from a string representation
pub fn parse_grid_from_string(content: &str) -> Result<Grid> {
    let lines: Vec<&str> = content.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        anyhow::bail!("Grid file is empty or contains no valid rows");
    }

    let mut cells = Vec::with_capacity(lines.len());

    for (row_idx, line) in lines.iter().enumerate() {
        let row = line.chars()
            .enumerate()
            .map(|(col_idx, ch)| -> Result<bool> {
                match ch {
                    '0' => Ok(false),
                    '1' => Ok(true),
                    _ => anyhow::bail!(
                        "Invalid character '{}' at position ({}, {}). Only '0' and '1' are allowed",
                        ch, row_idx, col_idx
                    ),
                }
            })
            .collect::<Result<Vec<bool>>>()?;
        cells.push(row);
    }

    Grid::from_cells(cells)
}

/// Save a grid to a text file
pub fn save_grid_to_file<P: AsRef<Path>>(grid: &Grid, path: P) -> Result<()> {
    let content = grid_to_string(grid);

    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write grid to file: {}", path.as_ref().display()))?;

    Ok(())
}

/// Convert a grid to string representation
pub fn grid_to_string(grid: &Grid) -> String {
    let mut result = String::with_capacity(grid.rows() * (grid.columns() + 1));

    for row in 0..grid.rows() {
        for col in 0..grid.columns() {
            result.push(if grid.get(row, col) { '1' } else { '0' });
        }
        result.push('\n');
    }

    result
}

/// Write the bundled example patterns into `output_dir`
pub fn create_example_grids<P: AsRef<Path>>(output_dir: P) -> Result<()> {
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let patterns = [
        ("glider.txt", "00100\n10100\n01100\n00000\n00000\n"),
        ("blinker.txt", "00000\n00000\n01110\n00000\n00000\n"),
        ("block.txt", "0000\n0110\n0110\n0000\n"),
        ("beacon.txt", "110000\n110000\n001100\n001100\n"),
    ];

    for (name, content) in patterns {
        std::fs::write(dir.join(name), content)
            .with_context(|| format!("Failed to write {}", name))?;
    }

    Ok(())
}
