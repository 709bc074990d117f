// simulation.rs
use crate::error::Result;
use crate::models::SimulationConfig;
use crate::services::gps_service::GpsService;
use crate::shared_data::{lock, now, read_lock, write_lock};
use crate::simulation_engine::vehicles::Fleet;

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

struct Runner {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives the fleet: every `intervalMS` each vehicle moves and reports a GPS
/// sample through [`GpsService::ingest`].
pub struct SimulationEngine {
    fleet: Arc<Fleet>,
    gps: Arc<GpsService>,
    config: Arc<RwLock<SimulationConfig>>,
    last_update: Arc<RwLock<Option<DateTime<Utc>>>>,
    runner: Mutex<Option<Runner>>,
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("running", &self.is_running())
            .field("vehicles", &self.fleet.len())
            .finish()
    }
}

/// One simulation step: moves the fleet and ingests the resulting samples.
/// Returns how many samples were accepted.
pub fn run_tick(fleet: &Fleet, gps: &GpsService, config: &SimulationConfig) -> usize {
    let elapsed_secs = config.interval_ms as f64 / 1000.0;
    let mut accepted = 0;
    for sample in fleet.step(config, elapsed_secs) {
        let vehicle_id = sample.vehicle_id.clone();
        match gps.ingest(sample) {
            Ok(_) => accepted += 1,
            Err(e) => log::warn!("Simulated sample from {} rejected: {}", vehicle_id, e),
        }
    }
    accepted
}

async fn run_simulation(
    fleet: Arc<Fleet>,
    gps: Arc<GpsService>,
    config: Arc<RwLock<SimulationConfig>>,
    last_update: Arc<RwLock<Option<DateTime<Utc>>>>,
    mut stop: oneshot::Receiver<()>,
) {
    log::info!("Simulation started");
    loop {
        // Re-read every tick so config updates apply to a running simulation.
        let interval_ms = read_lock(&config).interval_ms;
        tokio::select! {
            _ = &mut stop => break,
            _ = sleep(Duration::from_millis(interval_ms)) => {
                let snapshot = read_lock(&config).clone();
                let accepted = run_tick(&fleet, &gps, &snapshot);
                *write_lock(&last_update) = Some(now());
                log::debug!("Simulation tick: {} samples", accepted);
            }
        }
    }
    log::info!("Simulation stopped");
}

impl SimulationEngine {
    pub fn new(fleet: Arc<Fleet>, gps: Arc<GpsService>, config: SimulationConfig) -> Self {
        Self {
            fleet,
            gps,
            config: Arc::new(RwLock::new(config)),
            last_update: Arc::new(RwLock::new(None)),
            runner: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.runner)
            .as_ref()
            .is_some_and(|runner| !runner.handle.is_finished())
    }

    /// Tops up the fleet and spawns the simulation task. Returns `false` when
    /// it was already running. Must be called inside a tokio runtime.
    pub fn start(&self) -> bool {
        let mut runner = lock(&self.runner);
        if runner.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }

        let added = self.fleet.top_up(&read_lock(&self.config));
        if added > 0 {
            log::info!("Spawned {} simulated vehicles", added);
        }

        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_simulation(
            Arc::clone(&self.fleet),
            Arc::clone(&self.gps),
            Arc::clone(&self.config),
            Arc::clone(&self.last_update),
            stop_rx,
        ));
        *runner = Some(Runner { stop, handle });
        true
    }

    /// Signals the task to stop. Returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        match lock(&self.runner).take() {
            Some(runner) => {
                let was_running = !runner.handle.is_finished();
                let _ = runner.stop.send(());
                was_running
            }
            None => false,
        }
    }

    /// Stops the task and waits for it to finish.
    pub async fn shutdown(&self) {
        let runner = lock(&self.runner).take();
        if let Some(runner) = runner {
            let _ = runner.stop.send(());
            if let Err(e) = runner.handle.await {
                log::error!("Simulation task failed: {}", e);
            }
        }
    }

    /// Current configuration; `isActive` reflects whether the task runs.
    pub fn config(&self) -> SimulationConfig {
        let mut config = read_lock(&self.config).clone();
        config.is_active = self.is_running();
        config
    }

    /// Validates and stores a new configuration. A running simulation picks
    /// it up on its next tick.
    pub fn update_config(&self, mut config: SimulationConfig) -> Result<SimulationConfig> {
        config.validate()?;
        config.is_active = false;
        *write_lock(&self.config) = config;
        log::info!("Simulation config updated");
        Ok(self.config())
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *read_lock(&self.last_update)
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }
}
