//! Tracing subscriber setup for the binary

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so stdout carries only the grid.
pub fn init_tracing(verbose: bool) {
    // RUST_LOG=game_of_life_sim=debug
    let default_level = if verbose { "game_of_life_sim=debug" } else { "game_of_life_sim=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
