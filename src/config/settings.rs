//! Configuration settings for the Game of Life simulator

use crate::error::check_probability;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on `rows * columns` for a session grid
pub const MAX_GRID_CELLS: usize = 1 << 24;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridConfig,
    pub run: RunConfig,
    pub random: RandomConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub tick_interval_ms: u64,
    /// Return to idle once the generation counter reaches this value
    #[serde(default)]
    pub max_generations: Option<u64>,
    /// Return to idle when a step leaves no living cells
    #[serde(default)]
    pub halt_on_extinction: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomConfig {
    pub live_probability: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Compact,
    Coords,
    Json,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { rows: 30, columns: 30 }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            max_generations: None,
            halt_on_extinction: false,
        }
    }
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            live_probability: 0.3,
            seed: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: OutputFormat::Compact }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .context("Failed to serialize settings")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.grid.rows == 0 || self.grid.columns == 0 {
            anyhow::bail!(
                "Grid dimensions must be positive, got {}x{}",
                self.grid.rows,
                self.grid.columns
            );
        }

        match self.grid.rows.checked_mul(self.grid.columns) {
            Some(cells) if cells <= MAX_GRID_CELLS => {}
            _ => anyhow::bail!(
                "Grid of {}x{} exceeds the limit of {} cells",
                self.grid.rows,
                self.grid.columns,
                MAX_GRID_CELLS
            ),
        }

        if self.run.tick_interval_ms == 0 {
            anyhow::bail!("Tick interval must be positive");
        }

        if self.run.max_generations == Some(0) {
            anyhow::bail!("Maximum generations must be positive when set");
        }

        check_probability(self.random.live_probability)
            .context("Invalid random.live_probability")?;

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.run.tick_interval_ms)
    }

    /// Merge settings with command line overrides
    pub fn merge_with_cli(&mut self, cli_overrides: &CliOverrides) {
        if let Some(rows) = cli_overrides.rows {
            self.grid.rows = rows;
        }
        if let Some(columns) = cli_overrides.columns {
            self.grid.columns = columns;
        }
        if let Some(interval) = cli_overrides.tick_interval_ms {
            self.run.tick_interval_ms = interval;
        }
        if let Some(probability) = cli_overrides.live_probability {
            self.random.live_probability = probability;
        }
        if let Some(seed) = cli_overrides.seed {
            self.random.seed = Some(seed);
        }
        if let Some(format) = cli_overrides.format {
            self.output.format = format;
        }
    }
}

/// Command line overrides for settings
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub rows: Option<usize>,
    pub columns: Option<usize>,
    pub tick_interval_ms: Option<u64>,
    pub live_probability: Option<f64>,
    pub seed: Option<u64>,
    pub format: Option<OutputFormat>,
}
