//! Display and output formatting utilities

use crate::config::OutputFormat;
use crate::game_of_life::Grid;
use crate::runner::{RunState, Snapshot};
use anyhow::{Context, Result};

/// Formats grids and session snapshots for the terminal
pub struct GridFormatter;

impl GridFormatter {
    /// Render a snapshot in the requested format
    pub fn render(snapshot: &Snapshot, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Compact => Ok(format!(
                "{}\n{}",
                Self::format_status(snapshot),
                Self::format_grid_compact(&snapshot.grid)
            )),
            OutputFormat::Coords => Ok(format!(
                "{}\n{}",
                Self::format_status(snapshot),
                Self::format_grid_with_coords(&snapshot.grid)
            )),
            OutputFormat::Json => serde_json::to_string(snapshot)
                .context("Failed to serialize snapshot"),
        }
    }

    /// One-line summary: generation, run state and population
    pub fn format_status(snapshot: &Snapshot) -> String {
        let state = match snapshot.run_state {
            RunState::Idle => "idle",
            RunState::Running => "running",
        };
        format!(
            "Generation: {} | {} | Living: {}/{}",
            snapshot.generation,
            state,
            snapshot.grid.living_count(),
            snapshot.grid.rows() * snapshot.grid.columns()
        )
    }

    /// Format a grid in compact form
    pub fn format_grid_compact(grid: &Grid) -> String {
        let mut output = String::new();
        for row in 0..grid.rows() {
            for col in 0..grid.columns() {
                output.push(if grid.get(row, col) { '█' } else { '·' });
            }
            output.push('\n');
        }
        output
    }

    /// Format a grid with coordinates
    pub fn format_grid_with_coords(grid: &Grid) -> String {
        let mut output = String::new();

        output.push_str("   ");
        for col in 0..grid.columns() {
            output.push_str(&format!("{:2}", col % 10));
        }
        output.push('\n');

        for row in 0..grid.rows() {
            output.push_str(&format!("{:2} ", row));
            for col in 0..grid.columns() {
                output.push_str(if grid.get(row, col) { "██" } else { "··" });
            }
            output.push('\n');
        }

        output
    }
}

/// Color output utilities
pub struct ColorOutput;

impl ColorOutput {
    /// Format text with color (if terminal supports it)
    pub fn colored(text: &str, color: Color) -> String {
        if Self::supports_color() {
            format!("\x1b[{}m{}\x1b[0m", color.code(), text)
        } else {
            text.to_string()
        }
    }

    fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() &&
        (std::env::var("TERM").unwrap_or_default() != "dumb")
    }

    pub fn success(text: &str) -> String {
        Self::colored(text, Color::Green)
    }

    pub fn error(text: &str) -> String {
        Self::colored(text, Color::Red)
    }

    pub fn warning(text: &str) -> String {
        Self::colored(text, Color::Yellow)
    }

    pub fn info(text: &str) -> String {
        Self::colored(text, Color::Blue)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
        }
    }
}
