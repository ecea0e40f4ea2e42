//! Run loop: a single session task that owns the [`Simulation`] and applies
//! ticks and caller commands one at a time.
//!
//! Callers talk to the session through a cloneable [`SimulationHandle`]. All
//! grid transitions go through one command queue, so no lock guards the grid.
//! The run flag is checked before every tick; once a stop has been processed
//! no further tick runs.
//!
//! Snapshots are published on a `watch` channel, which only keeps the latest
//! value. A session spawned with [`spawn_with_frames`] also delivers every
//! tick's snapshot on a bounded queue; a slow reader there holds back the next
//! tick instead of missing generations.

use crate::config::Settings;
use crate::engine::Simulation;
use crate::error::SimulationError;
use crate::game_of_life::Grid;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

const COMMAND_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
}

/// What a renderer needs to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub grid: Arc<Grid>,
    pub generation: u64,
    pub run_state: RunState,
}

/// Cadence and halting rules for the run loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLoopOptions {
    pub interval: Duration,
    pub max_generations: Option<u64>,
    pub halt_on_extinction: bool,
}

impl RunLoopOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.tick_interval(),
            max_generations: settings.run.max_generations,
            halt_on_extinction: settings.run.halt_on_extinction,
        }
    }
}

#[derive(Debug)]
enum Command {
    Start { reply: oneshot::Sender<RunState> },
    Stop { reply: oneshot::Sender<RunState> },
    Clear { reply: oneshot::Sender<Snapshot> },
    Randomize {
        live_probability: Option<f64>,
        reply: oneshot::Sender<Result<Snapshot, SimulationError>>,
    },
    ToggleCell {
        row: usize,
        col: usize,
        reply: oneshot::Sender<Result<Snapshot, SimulationError>>,
    },
    Snapshot { reply: oneshot::Sender<Snapshot> },
    Shutdown,
}

/// Spawn a session task on the current tokio runtime.
///
/// The returned join handle yields the final [`Simulation`] once the session
/// is shut down or every handle has been dropped.
pub fn spawn(simulation: Simulation, options: RunLoopOptions) -> (SimulationHandle, JoinHandle<Simulation>) {
    launch(simulation, options, None)
}

/// Like [`spawn`], but every completed tick is also sent, in order, on the
/// returned receiver. Dropping the receiver turns frame delivery off.
pub fn spawn_with_frames(
    simulation: Simulation,
    options: RunLoopOptions,
    capacity: usize,
) -> (SimulationHandle, mpsc::Receiver<Snapshot>, JoinHandle<Simulation>) {
    let (frames_tx, frames_rx) = mpsc::channel(capacity.max(1));
    let (handle, task) = launch(simulation, options, Some(frames_tx));
    (handle, frames_rx, task)
}

fn launch(
    simulation: Simulation,
    options: RunLoopOptions,
    frames: Option<mpsc::Sender<Snapshot>>,
) -> (SimulationHandle, JoinHandle<Simulation>) {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let (snapshots_tx, snapshots) = watch::channel(Snapshot {
        grid: simulation.grid(),
        generation: simulation.generation(),
        run_state: RunState::Idle,
    });
    let session = Session {
        simulation,
        options,
        run_state: RunState::Idle,
        next_tick: Instant::now(),
        commands: commands_rx,
        snapshots: snapshots_tx,
        frames,
    };

    let task = tokio::spawn(session.run());
    (SimulationHandle { commands: commands_tx, snapshots }, task)
}

struct Session {
    simulation: Simulation,
    options: RunLoopOptions,
    run_state: RunState,
    next_tick: Instant,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<Snapshot>,
    frames: Option<mpsc::Sender<Snapshot>>,
}

impl Session {
    async fn run(mut self) -> Simulation {
        loop {
            let running = self.run_state == RunState::Running;
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = sleep_until(self.next_tick), if running => {
                    if let Some(frame) = self.tick() {
                        self.deliver_frame(frame).await;
                    }
                }
            }
        }

        debug!(generation = self.simulation.generation(), "session finished");
        self.simulation
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start { reply } => {
                self.start();
                let _ = reply.send(self.run_state);
            }
            Command::Stop { reply } => {
                self.stop();
                let _ = reply.send(self.run_state);
            }
            Command::Clear { reply } => {
                self.simulation.clear();
                let _ = reply.send(self.publish());
            }
            Command::Randomize { live_probability, reply } => {
                let result = match live_probability {
                    Some(p) => self.simulation.randomize_with(p),
                    None => self.simulation.randomize(),
                };
                let _ = reply.send(self.publish_result(result));
            }
            Command::ToggleCell { row, col, reply } => {
                let result = self.simulation.toggle_cell(row, col);
                let _ = reply.send(self.publish_result(result));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn start(&mut self) {
        if self.run_state == RunState::Running {
            debug!("start requested while running");
            return;
        }
        self.run_state = RunState::Running;
        // First tick is due immediately
        self.next_tick = Instant::now();
        info!(interval_ms = self.options.interval.as_millis() as u64, "simulation started");
        self.publish();
    }

    fn stop(&mut self) {
        if self.run_state == RunState::Idle {
            debug!("stop requested while idle");
            return;
        }
        self.run_state = RunState::Idle;
        info!(generation = self.simulation.generation(), "simulation stopped");
        self.publish();
    }

    async fn deliver_frame(&mut self, frame: Snapshot) {
        let Some(frames) = &self.frames else {
            return;
        };
        if frames.send(frame).await.is_err() {
            debug!("frame receiver dropped");
            self.frames = None;
        }
    }

    fn tick(&mut self) -> Option<Snapshot> {
        if self.run_state != RunState::Running {
            return None;
        }

        let generation = self.simulation.step();
        self.next_tick = Instant::now() + self.options.interval;

        if self.options.max_generations.is_some_and(|max| generation >= max) {
            self.run_state = RunState::Idle;
            info!(generation, "generation limit reached");
        } else if self.options.halt_on_extinction && self.simulation.grid().is_empty() {
            self.run_state = RunState::Idle;
            info!(generation, "population extinct");
        }

        Some(self.publish())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid: self.simulation.grid(),
            generation: self.simulation.generation(),
            run_state: self.run_state,
        }
    }

    fn publish(&self) -> Snapshot {
        let snapshot = self.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    fn publish_result(&self, result: Result<(), SimulationError>) -> Result<Snapshot, SimulationError> {
        match result {
            Ok(()) => Ok(self.publish()),
            Err(err) => {
                warn!(%err, "command rejected");
                Err(err)
            }
        }
    }
}

/// Caller-side API of a running session
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl SimulationHandle {
    /// `Idle -> Running`; a no-op while running
    pub async fn start(&self) -> Result<RunState, SimulationError> {
        self.request(|reply| Command::Start { reply }).await
    }

    /// `Running -> Idle`; a no-op while idle
    pub async fn stop(&self) -> Result<RunState, SimulationError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    pub async fn clear(&self) -> Result<Snapshot, SimulationError> {
        self.request(|reply| Command::Clear { reply }).await
    }

    /// Randomize with the session's configured probability
    pub async fn randomize(&self) -> Result<Snapshot, SimulationError> {
        self.request(|reply| Command::Randomize { live_probability: None, reply }).await?
    }

    pub async fn randomize_with(&self, live_probability: f64) -> Result<Snapshot, SimulationError> {
        self.request(|reply| Command::Randomize { live_probability: Some(live_probability), reply })
            .await?
    }

    pub async fn toggle_cell(&self, row: usize, col: usize) -> Result<Snapshot, SimulationError> {
        self.request(|reply| Command::ToggleCell { row, col, reply }).await?
    }

    pub async fn snapshot(&self) -> Result<Snapshot, SimulationError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Ask the session to finish. Commands already queued ahead of this one are applied first.
    pub async fn shutdown(&self) -> Result<(), SimulationError> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| SimulationError::SessionClosed)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SimulationError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| SimulationError::SessionClosed)?;
        reply_rx.await.map_err(|_| SimulationError::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(interval_ms: u64) -> RunLoopOptions {
        RunLoopOptions {
            interval: Duration::from_millis(interval_ms),
            max_generations: None,
            halt_on_extinction: false,
        }
    }

    fn blinker_session(options: RunLoopOptions) -> (SimulationHandle, JoinHandle<Simulation>) {
        let mut settings = Settings::default();
        settings.grid.rows = 5;
        settings.grid.columns = 5;
        settings.random.seed = Some(8);
        let grid = Grid::from_fn(5, 5, |r, c| r == 2 && (1..=3).contains(&c));
        let simulation = Simulation::with_grid(&settings, grid).unwrap();
        spawn(simulation, options)
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_snapshot_is_idle() {
        let (handle, _task) = blinker_session(options(1000));
        let snapshot = handle.snapshot().await.unwrap();

        assert_eq!(snapshot.run_state, RunState::Idle);
        assert_eq!(snapshot.generation, 0);
        assert_eq!(snapshot.grid.living_count(), 3);
        assert_eq!(handle.subscribe().borrow().generation, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_fixed_cadence() {
        let (handle, _task) = blinker_session(options(1000));
        let mut rx = handle.subscribe();
        let started = Instant::now();

        assert_eq!(handle.start().await.unwrap(), RunState::Running);

        rx.wait_for(|s| s.generation == 1).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(1000));

        rx.wait_for(|s| s.generation == 3).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(3000), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blinker_alternates_while_running() {
        let (handle, _task) = blinker_session(options(10));
        let mut rx = handle.subscribe();
        handle.start().await.unwrap();

        let odd = rx.wait_for(|s| s.generation == 1).await.unwrap().clone();
        assert_eq!(odd.grid.living_cells(), vec![(1, 2), (2, 2), (3, 2)]);

        let even = rx.wait_for(|s| s.generation == 2).await.unwrap().clone();
        assert_eq!(even.grid.living_cells(), vec![(2, 1), (2, 2), (2, 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_quiesces_the_loop() {
        let (handle, _task) = blinker_session(options(100));
        let mut rx = handle.subscribe();
        handle.start().await.unwrap();
        rx.wait_for(|s| s.generation == 2).await.unwrap();

        assert_eq!(handle.stop().await.unwrap(), RunState::Idle);
        let stopped_at = handle.snapshot().await.unwrap().generation;

        tokio::time::sleep(Duration::from_secs(5)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.run_state, RunState::Idle);
        assert_eq!(snapshot.generation, stopped_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redundant_start_and_stop_are_noops() {
        let (handle, _task) = blinker_session(options(1000));

        assert_eq!(handle.stop().await.unwrap(), RunState::Idle);
        assert_eq!(handle.snapshot().await.unwrap().generation, 0);

        handle.start().await.unwrap();
        assert_eq!(handle.start().await.unwrap(), RunState::Running);

        // Ticks at 0, 1000 and 2000 ms; a second start must not add any
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(handle.snapshot().await.unwrap().generation, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_and_randomize_reset_counter_while_running() {
        let (handle, _task) = blinker_session(options(50));
        let mut rx = handle.subscribe();
        handle.start().await.unwrap();
        rx.wait_for(|s| s.generation >= 3).await.unwrap();

        let cleared = handle.clear().await.unwrap();
        assert_eq!(cleared.generation, 0);
        assert!(cleared.grid.is_empty());
        assert_eq!(cleared.run_state, RunState::Running);

        rx.wait_for(|s| s.generation >= 2).await.unwrap();
        let randomized = handle.randomize_with(0.5).await.unwrap();
        assert_eq!(randomized.generation, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_commands_surface_errors() {
        let (handle, _task) = blinker_session(options(1000));

        let err = handle.toggle_cell(5, 0).await.unwrap_err();
        assert_eq!(err, SimulationError::OutOfRange { row: 5, col: 0, rows: 5, cols: 5 });

        let err = handle.randomize_with(-1.0).await.unwrap_err();
        assert_eq!(err, SimulationError::InvalidProbability(-1.0));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.grid.living_cells(), vec![(2, 1), (2, 2), (2, 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_publishes_new_grid() {
        let (handle, _task) = blinker_session(options(1000));
        let before = handle.snapshot().await.unwrap();

        let after = handle.toggle_cell(0, 0).await.unwrap();

        assert!(after.grid.get(0, 0));
        assert!(!before.grid.get(0, 0));
        assert!(handle.subscribe().borrow().grid.get(0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_limit_returns_to_idle() {
        let mut opts = options(100);
        opts.max_generations = Some(3);
        let (handle, _task) = blinker_session(opts);
        let mut rx = handle.subscribe();
        handle.start().await.unwrap();

        rx.wait_for(|s| s.run_state == RunState::Idle && s.generation == 3)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.snapshot().await.unwrap().generation, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extinction_halt() {
        let mut opts = options(100);
        opts.halt_on_extinction = true;
        let (handle, _task) = blinker_session(opts);
        handle.clear().await.unwrap();
        handle.toggle_cell(1, 1).await.unwrap();

        let mut rx = handle.subscribe();
        handle.start().await.unwrap();

        let snapshot = rx
            .wait_for(|s| s.run_state == RunState::Idle && s.generation > 0)
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.generation, 1);
        assert!(snapshot.grid.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_reach_slow_reader_without_gaps() {
        let mut opts = options(1);
        opts.max_generations = Some(50);
        let mut settings = Settings::default();
        settings.grid.rows = 5;
        settings.grid.columns = 5;
        let grid = Grid::from_fn(5, 5, |r, c| r == 2 && (1..=3).contains(&c));
        let simulation = Simulation::with_grid(&settings, grid).unwrap();
        let (handle, mut frames, _task) = spawn_with_frames(simulation, opts, 4);

        handle.start().await.unwrap();

        let mut generations = Vec::new();
        while let Some(frame) = frames.recv().await {
            generations.push(frame.generation);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if frame.run_state == RunState::Idle {
                break;
            }
        }

        assert_eq!(generations, (1..=50).collect::<Vec<u64>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_frame_receiver_does_not_stall_session() {
        let mut opts = options(10);
        opts.max_generations = Some(5);
        let simulation = Simulation::new(&Settings::default());
        let (handle, frames, _task) = spawn_with_frames(simulation, opts, 1);
        drop(frames);

        let mut rx = handle.subscribe();
        handle.start().await.unwrap();
        rx.wait_for(|s| s.run_state == RunState::Idle && s.generation == 5)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_returns_simulation() {
        let (handle, task) = blinker_session(options(1000));
        handle.toggle_cell(0, 4).await.unwrap();
        handle.shutdown().await.unwrap();

        let simulation = task.await.unwrap();
        assert!(simulation.grid().get(0, 4));
        assert_eq!(handle.snapshot().await.unwrap_err(), SimulationError::SessionClosed);
    }
}
