//! Terminal output helpers

pub mod display;
pub mod logging;

pub use display::{ColorOutput, GridFormatter};
pub use logging::init_tracing;
