//! Simulation runner with lifecycle management
//!
//! This module provides the `SimulationRunner` which drives the simulation
//! in a background thread. Readers never touch the live particle arrays:
//! after every tick the thread copies positions and densities into a frame
//! buffer and wakes anyone waiting on it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use kernel::{ErrorMetrics, ParticleSnapshot, Simulation, SimulationKernel};
use surface::{IsosurfaceExtractor, MarchingTetrahedra, Reconstruction, ReconstructionSettings};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::export::{write_mesh, ObjSequence};

/// Runner state enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Simulation created but not yet started
    Created,
    /// Simulation actively running
    Running,
    /// Simulation paused
    Paused,
    /// Simulation finished (stopped or reached its tick limit)
    Finished,
}

/// A published copy of the particle state.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Increases by one with every tick.
    pub generation: u64,
    /// Positions and densities after that tick.
    pub snapshot: ParticleSnapshot,
}

/// Optional behavior of a runner.
#[derive(Clone)]
pub struct RunnerOptions {
    /// Stop after this many ticks.
    pub max_timesteps: Option<u64>,
    /// Settings for `reconstruct_now` and OBJ export.
    pub reconstruction: ReconstructionSettings,
    /// Surface extractor used for reconstruction.
    pub extractor: Arc<dyn IsosurfaceExtractor>,
    /// Periodic OBJ export.
    pub obj_sequence: Option<ObjSequence>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            max_timesteps: None,
            reconstruction: ReconstructionSettings::default(),
            extractor: Arc::new(MarchingTetrahedra),
            obj_sequence: None,
        }
    }
}

/// Lifecycle state shared between the runner thread and control interface
struct Control {
    state: RunnerState,
    sim_time: f64,
    timestep_count: u64,
}

struct Shared {
    /// Guards the whole tick; readers copy out under it.
    simulation: Mutex<Simulation>,
    control: Mutex<Control>,
    frame: Mutex<Frame>,
    frame_ready: Condvar,
    options: RunnerOptions,
}

/// A poisoned lock only means another thread panicked mid-update; the data
/// is still the latest written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for controlling and querying a running simulation
pub struct SimulationRunner {
    shared: Arc<Shared>,
    /// Handle to the background thread
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl SimulationRunner {
    /// Create a runner around `simulation`. The tick thread is spawned
    /// immediately but waits for [`SimulationRunner::start`].
    pub fn new(simulation: Simulation, options: RunnerOptions) -> Self {
        let frame = Frame {
            generation: 0,
            snapshot: simulation.snapshot(),
        };
        let shared = Arc::new(Shared {
            simulation: Mutex::new(simulation),
            control: Mutex::new(Control {
                state: RunnerState::Created,
                sim_time: 0.0,
                timestep_count: 0,
            }),
            frame: Mutex::new(frame),
            frame_ready: Condvar::new(),
            options,
        });

        let shared_clone = Arc::clone(&shared);
        let thread_handle = thread::spawn(move || run_simulation_loop(&shared_clone));

        Self {
            shared,
            thread_handle: Some(thread_handle),
        }
    }

    /// Get current runner state
    pub fn state(&self) -> RunnerState {
        lock(&self.shared.control).state
    }

    /// Get current simulation time (seconds)
    pub fn sim_time(&self) -> f64 {
        lock(&self.shared.control).sim_time
    }

    /// Get current timestep count
    pub fn timestep_count(&self) -> u64 {
        lock(&self.shared.control).timestep_count
    }

    /// Start the simulation (transition from Created to Running)
    pub fn start(&self) {
        let mut control = lock(&self.shared.control);
        if control.state == RunnerState::Created {
            control.state = RunnerState::Running;
            tracing::info!("Simulation started");
        }
    }

    /// Pause the simulation
    pub fn pause(&self) {
        let mut control = lock(&self.shared.control);
        if control.state == RunnerState::Running {
            control.state = RunnerState::Paused;
        }
    }

    /// Resume the simulation
    pub fn resume(&self) {
        let mut control = lock(&self.shared.control);
        if control.state == RunnerState::Paused {
            control.state = RunnerState::Running;
        }
    }

    /// Ask the thread to exit after the tick in progress.
    pub fn stop(&self) {
        lock(&self.shared.control).state = RunnerState::Finished;
    }

    /// Copy of the current positions and densities, taken under the
    /// simulation lock.
    pub fn snapshot(&self) -> ParticleSnapshot {
        lock(&self.shared.simulation).snapshot()
    }

    /// Current error / conservation metrics.
    pub fn error_metrics(&self) -> ErrorMetrics {
        lock(&self.shared.simulation).error_metrics()
    }

    /// Latest published frame.
    pub fn latest_frame(&self) -> Frame {
        lock(&self.shared.frame).clone()
    }

    /// Wait up to `timeout` for a frame newer than `last_generation`.
    ///
    /// `None` when nothing new was published in time; callers simply skip
    /// a redraw.
    pub fn wait_for_frame(&self, last_generation: u64, timeout: Duration) -> Option<Frame> {
        let guard = lock(&self.shared.frame);
        let (guard, _) = self
            .shared
            .frame_ready
            .wait_timeout_while(guard, timeout, |frame| frame.generation <= last_generation)
            .unwrap_or_else(PoisonError::into_inner);
        (guard.generation > last_generation).then(|| guard.clone())
    }

    /// Reconstruct the surface of the current state.
    pub fn reconstruct_now(&self) -> OrchestratorResult<Reconstruction> {
        let snapshot = self.snapshot();
        let options = &self.shared.options;
        Ok(surface::reconstruct(
            &snapshot,
            &options.reconstruction,
            options.extractor.as_ref(),
        )?)
    }

    /// Wait for the simulation thread to complete. A runner that was never
    /// started is finished first.
    pub fn join(mut self) -> OrchestratorResult<()> {
        {
            let mut control = lock(&self.shared.control);
            if control.state == RunnerState::Created {
                control.state = RunnerState::Finished;
            }
        }
        if let Some(handle) = self.thread_handle.take() {
            handle
                .join()
                .map_err(|_| OrchestratorError::ThreadPanicked)?;
        }
        Ok(())
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        // Signal the thread to exit; it must not outlive an unstarted runner
        lock(&self.shared.control).state = RunnerState::Finished;
    }
}

/// Main simulation loop executed in background thread
fn run_simulation_loop(shared: &Shared) {
    // Wait for start signal
    loop {
        match lock(&shared.control).state {
            RunnerState::Created => thread::sleep(Duration::from_millis(10)),
            RunnerState::Running => break,
            _ => return,
        }
    }

    let start_wall_time = Instant::now();
    let max_timesteps = shared.options.max_timesteps;

    loop {
        let current_state = lock(&shared.control).state;

        match current_state {
            RunnerState::Running => {
                let (tick, dt) = {
                    let mut sim = lock(&shared.simulation);
                    sim.tick();
                    let tick = sim.tick_count();
                    let mut frame = lock(&shared.frame);
                    frame
                        .snapshot
                        .copy_from(sim.particles(), sim.smoothing_length(), tick);
                    frame.generation += 1;
                    (tick, sim.config().dt)
                };
                shared.frame_ready.notify_all();

                let sim_time = {
                    let mut control = lock(&shared.control);
                    control.timestep_count = tick;
                    control.sim_time += dt as f64;
                    control.sim_time
                };

                if let Some(seq) = &shared.options.obj_sequence {
                    if seq.is_due(tick) {
                        export_frame(shared, seq, tick);
                    }
                }

                // Check stopping conditions
                if let Some(max_steps) = max_timesteps {
                    if tick >= max_steps {
                        tracing::info!(
                            "Simulation finished: reached max_timesteps = {}",
                            max_steps
                        );
                        lock(&shared.control).state = RunnerState::Finished;
                        break;
                    }
                }

                // Log progress periodically
                if tick % 100 == 0 {
                    tracing::debug!(
                        "Step {}: sim_time={:.4}s, wall_time={:.2}s",
                        tick,
                        sim_time,
                        start_wall_time.elapsed().as_secs_f64(),
                    );
                }
            }
            RunnerState::Paused => {
                // Wait while paused
                thread::sleep(Duration::from_millis(50));
            }
            RunnerState::Finished | RunnerState::Created => break,
        }
    }

    let control = lock(&shared.control);
    tracing::info!(
        "Simulation thread exiting: {} timesteps, {:.4}s simulated",
        control.timestep_count,
        control.sim_time
    );
}

/// Reconstruct the latest frame and write it to the sequence directory.
/// Failures are logged and the run continues.
fn export_frame(shared: &Shared, seq: &ObjSequence, tick: u64) {
    let snapshot = lock(&shared.frame).snapshot.clone();
    let options = &shared.options;
    let path = seq.frame_path(tick);
    let result = surface::reconstruct(
        &snapshot,
        &options.reconstruction,
        options.extractor.as_ref(),
    )
    .map_err(OrchestratorError::from)
    .and_then(|r| write_mesh(&path, &r.mesh));
    match result {
        Ok(()) => tracing::info!("Wrote {}", path.display()),
        Err(e) => tracing::warn!("Mesh export at tick {} failed: {}", tick, e),
    }
}
