//! Configuration management for the Game of Life simulator

pub mod settings;

pub use settings::{
    Settings, GridConfig, RunConfig, RandomConfig, OutputConfig, OutputFormat, CliOverrides
};
