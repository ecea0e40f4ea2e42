//! Terminal front end for the Game of Life simulator

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use game_of_life_sim::{
    config::{CliOverrides, OutputFormat, Settings},
    game_of_life::{create_example_grids, load_grid_from_file, save_grid_to_file},
    runner::{self, RunLoopOptions, RunState, SimulationHandle, Snapshot},
    utils::{init_tracing, ColorOutput, GridFormatter},
    Simulation, SimulationError,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "game_of_life_sim")]
#[command(about = "Conway's Game of Life simulator")]
#[command(version = "0.1.0")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session driven by commands on stdin
    Play {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Run a fixed number of generations without interaction
    Run {
        #[command(flatten)]
        session: SessionArgs,

        /// Number of generations to run
        #[arg(short, long, default_value_t = 10)]
        generations: u64,

        /// Start from a random grid
        #[arg(long, conflicts_with = "pattern")]
        random: bool,

        /// Print every generation, not just the last
        #[arg(long)]
        show_evolution: bool,
    },

    /// Create a default configuration and example patterns
    Setup {
        /// Directory to create files in
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Pattern file to start from, centered in the grid
    #[arg(short, long)]
    pattern: Option<PathBuf>,

    /// Grid rows (overrides config)
    #[arg(long)]
    rows: Option<usize>,

    /// Grid columns (overrides config)
    #[arg(long)]
    columns: Option<usize>,

    /// Milliseconds between generations (overrides config)
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Live probability used by randomize (overrides config)
    #[arg(long)]
    probability: Option<f64>,

    /// RNG seed for reproducible random grids (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Output format (overrides config)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

/// A line typed during `play`
#[derive(Debug, Clone, PartialEq)]
enum UserCommand {
    Start,
    Stop,
    Clear,
    Random(Option<f64>),
    Toggle(usize, usize),
    Show,
    Save(PathBuf),
    Help,
    Quit,
}

const PLAY_HELP: &str = "\
Commands:
  start              run the simulation
  stop               pause the simulation
  clear              kill every cell and reset the generation counter
  random [p]         fill the grid randomly (optional live probability)
  toggle <row> <col> flip one cell
  show               print the current grid
  save <file>        write the current grid as a 0/1 pattern file
  help               show this message
  quit               leave";

const FRAME_QUEUE_DEPTH: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Play { session } => play_command(session).await,
        Commands::Run { session, generations, random, show_evolution } => {
            run_command(session, generations, random, show_evolution).await
        }
        Commands::Setup { directory, force } => setup_command(directory, force),
    }
}

fn load_settings(args: &SessionArgs) -> Result<Settings> {
    let mut settings = if args.config.exists() {
        Settings::from_file(&args.config)
            .with_context(|| format!("Failed to load config from {}", args.config.display()))?
    } else {
        tracing::warn!(path = %args.config.display(), "config file not found, using defaults");
        Settings::default()
    };

    settings.merge_with_cli(&CliOverrides {
        rows: args.rows,
        columns: args.columns,
        tick_interval_ms: args.interval_ms,
        live_probability: args.probability,
        seed: args.seed,
        format: args.format,
    });

    settings.validate()
        .context("Configuration validation failed")?;
    Ok(settings)
}

fn initial_simulation(settings: &Settings, pattern: Option<&Path>) -> Result<Simulation> {
    let Some(path) = pattern else {
        return Ok(Simulation::new(settings));
    };

    let grid = load_grid_from_file(path)?
        .centered_in(settings.grid.rows, settings.grid.columns)
        .with_context(|| format!("Pattern {} does not fit the grid", path.display()))?;
    tracing::info!(path = %path.display(), live = grid.living_count(), "pattern loaded");

    Ok(Simulation::with_grid(settings, grid)?)
}

async fn play_command(args: SessionArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    let simulation = initial_simulation(&settings, args.pattern.as_deref())?;
    let format = settings.output.format;

    let (handle, task) = runner::spawn(simulation, RunLoopOptions::from_settings(&settings));
    let renderer = tokio::spawn(render_snapshots(handle.subscribe(), format));

    println!("{}", ColorOutput::info("Conway's Game of Life"));
    println!("{}", PLAY_HELP);
    println!("{}", GridFormatter::render(&handle.snapshot().await?, format)?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = match parse_user_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{}", ColorOutput::warning(&err.to_string()));
                continue;
            }
        };

        if !apply_user_command(&handle, command, format).await? {
            break;
        }
    }

    handle.shutdown().await?;
    let simulation = task.await.context("Simulation task failed")?;
    renderer.abort();

    println!("{}", ColorOutput::success(&format!(
        "Stopped after {} generation(s)", simulation.generation()
    )));
    Ok(())
}

/// Forward one command to the session. Returns `false` when the user quits.
async fn apply_user_command(
    handle: &SimulationHandle,
    command: UserCommand,
    format: OutputFormat,
) -> Result<bool> {
    match command {
        UserCommand::Start => {
            handle.start().await?;
        }
        UserCommand::Stop => {
            handle.stop().await?;
        }
        UserCommand::Clear => {
            handle.clear().await?;
        }
        UserCommand::Random(probability) => {
            let result = match probability {
                Some(p) => handle.randomize_with(p).await,
                None => handle.randomize().await,
            };
            report_rejection(result)?;
        }
        UserCommand::Toggle(row, col) => {
            report_rejection(handle.toggle_cell(row, col).await)?;
        }
        UserCommand::Show => {
            println!("{}", GridFormatter::render(&handle.snapshot().await?, format)?);
        }
        UserCommand::Save(path) => {
            let snapshot = handle.snapshot().await?;
            match save_grid_to_file(&snapshot.grid, &path) {
                Ok(()) => println!("{}", ColorOutput::success(&format!(
                    "Saved generation {} to {}", snapshot.generation, path.display()
                ))),
                Err(err) => println!("{}", ColorOutput::error(&format!("{:#}", err))),
            }
        }
        UserCommand::Help => println!("{}", PLAY_HELP),
        UserCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Print contract violations and keep going; a closed session is fatal
fn report_rejection(result: Result<Snapshot, SimulationError>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(SimulationError::SessionClosed) => Err(SimulationError::SessionClosed.into()),
        Err(err) => {
            println!("{}", ColorOutput::error(&err.to_string()));
            Ok(())
        }
    }
}

async fn render_snapshots(mut snapshots: watch::Receiver<Snapshot>, format: OutputFormat) -> Result<()> {
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        println!("{}", GridFormatter::render(&snapshot, format)?);
    }
    Ok(())
}

fn parse_user_command(line: &str) -> Result<Option<UserCommand>> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "start" => UserCommand::Start,
        "stop" => UserCommand::Stop,
        "clear" => UserCommand::Clear,
        "random" => {
            let probability = words.next()
                .map(|p| p.parse::<f64>().with_context(|| format!("Invalid probability: {}", p)))
                .transpose()?;
            UserCommand::Random(probability)
        }
        "toggle" => {
            let (Some(row), Some(col)) = (words.next(), words.next()) else {
                anyhow::bail!("Usage: toggle <row> <col>");
            };
            let row = row.parse().with_context(|| format!("Invalid row: {}", row))?;
            let col = col.parse().with_context(|| format!("Invalid column: {}", col))?;
            UserCommand::Toggle(row, col)
        }
        "show" => UserCommand::Show,
        "save" => {
            let Some(path) = words.next() else {
                anyhow::bail!("Usage: save <file>");
            };
            UserCommand::Save(PathBuf::from(path))
        }
        "help" | "?" => UserCommand::Help,
        "quit" | "exit" => UserCommand::Quit,
        other => anyhow::bail!("Unknown command '{}' (type 'help')", other),
    };

    if words.next().is_some() {
        anyhow::bail!("Too many arguments for '{}'", word);
    }
    Ok(Some(command))
}

async fn run_command(
    args: SessionArgs,
    generations: u64,
    random: bool,
    show_evolution: bool,
) -> Result<()> {
    let mut settings = load_settings(&args)?;
    settings.run.max_generations = Some(generations);
    settings.validate()
        .context("Configuration validation failed")?;

    let simulation = initial_simulation(&settings, args.pattern.as_deref())?;
    let format = settings.output.format;

    let last = run_generations(simulation, RunLoopOptions::from_settings(&settings), random, |snapshot| {
        if show_evolution {
            println!("{}", GridFormatter::render(snapshot, format)?);
        }
        Ok(())
    })
    .await?;

    if !show_evolution {
        println!("{}", GridFormatter::render(&last, format)?);
    }

    println!("{}", ColorOutput::success(&format!(
        "Finished after {} generation(s), {} living cell(s)",
        last.generation,
        last.grid.living_count()
    )));
    Ok(())
}

/// Run the session until it halts, handing the starting grid and then every
/// generation to `on_frame` in order. Returns the final snapshot.
async fn run_generations(
    simulation: Simulation,
    options: RunLoopOptions,
    random: bool,
    mut on_frame: impl FnMut(&Snapshot) -> Result<()>,
) -> Result<Snapshot> {
    let (handle, mut frames, task) = runner::spawn_with_frames(simulation, options, FRAME_QUEUE_DEPTH);

    if random {
        handle.randomize().await?;
    }
    on_frame(&handle.snapshot().await?)?;

    handle.start().await?;

    let last = loop {
        let frame = frames.recv().await
            .context("Simulation session ended unexpectedly")?;
        on_frame(&frame)?;
        if frame.run_state == RunState::Idle {
            break frame;
        }
    };

    handle.shutdown().await?;
    task.await.context("Simulation task failed")?;
    Ok(last)
}

fn setup_command(directory: PathBuf, force: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Setting up project structure..."));

    let config_dir = directory.join("config");
    let patterns_dir = directory.join("patterns");

    for dir in [&config_dir, &patterns_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let config_path = config_dir.join("default.yaml");
    if !config_path.exists() || force {
        Settings::default().to_file(&config_path)
            .context("Failed to create default configuration")?;
        println!("Created: {}", config_path.display());
    } else {
        println!("Skipped: {} (already exists)", config_path.display());
    }

    create_example_grids(&patterns_dir)
        .context("Failed to create example patterns")?;
    println!("Created example patterns in: {}", patterns_dir.display());

    let examples_dir = config_dir.join("examples");
    std::fs::create_dir_all(&examples_dir)?;

    let mut fast = Settings::default();
    fast.run.tick_interval_ms = 100;
    fast.run.halt_on_extinction = true;
    fast.to_file(&examples_dir.join("fast.yaml"))?;

    let mut large = Settings::default();
    large.grid.rows = 60;
    large.grid.columns = 80;
    large.random.seed = Some(42);
    large.output.format = OutputFormat::Coords;
    large.to_file(&examples_dir.join("large.yaml"))?;

    println!("Created example configurations in: {}", examples_dir.display());

    println!("\n{}", ColorOutput::success("Setup complete!"));
    println!("\nNext steps:");
    println!("1. Edit {}", config_path.display());
    println!("2. Run: cargo run -- play --pattern {}", patterns_dir.join("glider.txt").display());

    Ok(())
}
