//! The monitoring loop and its controls.
//!
//! A [`Monitor`] is either idle or running one cycle task. `start` loads the
//! seen-set, resets the run state and spawns the task; `stop` cancels it
//! cooperatively and never waits for it. The task only notices cancellation
//! before fetching a URL and while sleeping between cycles, so a fetch in
//! progress always finishes and whatever it found is notified and persisted
//! before the task exits.

pub mod cycle;
pub mod state;

#[cfg(test)]
mod tests;

use crate::config::MonitorConfig;
use crate::crawlers::PageFetcher;
use crate::error::ControlError;
use crate::notifiers::Notifier;
use crate::offer::Offer;
use crate::parsers::OfferExtractor;
use crate::store::{SeenSet, SeenStore};
use std::sync::{Arc, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

pub use cycle::{CycleReport, MonitorDeps};
pub use state::{MonitorStatus, RECENT_OFFERS_CAP, RunState};

use cycle::Worker;

/// How long `start` waits for a stopped run to finish its last cycle
pub const RESTART_GRACE: Duration = Duration::from_secs(5);

/// Handle on the spawned cycle task
struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RunHandle {
    fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

/// Periodically scans deal pages and notifies about offers not seen before
pub struct Monitor {
    deps: MonitorDeps,
    recent_cap: usize,
    restart_grace: Duration,
    state: Arc<RwLock<RunState>>,
    /// Never held across an await
    run: std::sync::Mutex<Option<RunHandle>>,
    /// Serialises `start` and `shutdown`
    starting: tokio::sync::Mutex<()>,
}

impl Monitor {
    /// Create an idle monitor over the given collaborators
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn OfferExtractor>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn SeenStore>,
    ) -> Self {
        Self {
            deps: MonitorDeps {
                fetcher,
                extractor,
                notifier,
                store,
                base_origin: None,
            },
            recent_cap: RECENT_OFFERS_CAP,
            restart_grace: RESTART_GRACE,
            state: Arc::new(RwLock::new(RunState::default())),
            run: std::sync::Mutex::new(None),
            starting: tokio::sync::Mutex::new(()),
        }
    }

    /// Resolve relative product links against a fixed origin instead of each page's own
    pub fn with_base_origin(mut self, origin: Url) -> Self {
        self.deps.base_origin = Some(origin);
        self
    }

    /// Set how many recent offers are kept for display
    pub fn with_recent_capacity(mut self, cap: usize) -> Self {
        self.recent_cap = cap;
        self
    }

    /// Set how long a start waits for a stopped run that is still mid-cycle
    pub fn with_restart_grace(mut self, grace: Duration) -> Self {
        self.restart_grace = grace;
        self
    }

    /// Start a run with `config`
    ///
    /// Returns once the cycle task is spawned. A stopped run that is still
    /// finishing its last cycle is given up to the restart grace to persist
    /// what it found, so the seen-set loaded here is current; if it needs
    /// longer, the start is refused with [`ControlError::Stopping`].
    pub async fn start(&self, config: MonitorConfig) -> Result<(), ControlError> {
        config.validate()?;
        let _starting = self.starting.lock().await;

        let previous = {
            let mut run = self.lock_run();
            if run.as_ref().is_some_and(RunHandle::is_running) {
                return Err(ControlError::AlreadyRunning);
            }
            run.take()
        };
        if let Some(previous) = previous {
            self.finish_previous(previous).await?;
        }

        let seen = self.load_seen().await;

        ::log::info!(
            "Starting monitor for {} with {} previously seen offer(s)",
            config.recipient,
            seen.len()
        );

        *self.write_state() = RunState::started(config.urls.clone(), seen.len(), self.recent_cap);

        let cancel = CancellationToken::new();
        let worker = Worker::new(
            self.deps.clone(),
            config,
            seen,
            Arc::clone(&self.state),
            cancel.clone(),
        );
        let task = tokio::spawn(worker.run());

        *self.lock_run() = Some(RunHandle { cancel, task });
        Ok(())
    }

    /// Ask the running cycle task to stop
    ///
    /// Returns immediately; the task exits at its next cancellation point.
    pub async fn stop(&self) -> Result<(), ControlError> {
        let run = self.lock_run();
        match run.as_ref() {
            Some(handle) if handle.is_running() => {
                handle.cancel.cancel();
                self.write_state().active = false;
                ::log::info!("Stop requested");
                Ok(())
            }
            _ => Err(ControlError::NotRunning),
        }
    }

    /// Stop any run and wait for its task to finish
    pub async fn shutdown(&self) {
        let _starting = self.starting.lock().await;
        let handle = self.lock_run().take();
        if let Some(handle) = handle {
            handle.cancel.cancel();
            self.write_state().active = false;
            if let Err(e) = handle.task.await {
                ::log::error!("Monitor run ended abnormally: {}", e);
            }
        }
    }

    /// Snapshot of the current run
    pub fn status(&self) -> MonitorStatus {
        self.read_state().status()
    }

    /// Recently found offers, most recent first
    pub fn recent_offers(&self) -> Vec<Offer> {
        self.read_state().recent_offers()
    }

    /// Waits, bounded by the restart grace, for a previous run's task to end
    ///
    /// The handle is put back if the task is still busy, so a later start
    /// or shutdown can pick it up again.
    async fn finish_previous(&self, mut previous: RunHandle) -> Result<(), ControlError> {
        previous.cancel.cancel();
        let finished = tokio::time::timeout(self.restart_grace, &mut previous.task).await;
        match finished {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                ::log::error!("Previous monitor run ended abnormally: {}", e);
                Ok(())
            }
            Err(_) => {
                ::log::warn!("Previous monitor run is still finishing its cycle");
                *self.lock_run() = Some(previous);
                Err(ControlError::Stopping)
            }
        }
    }

    /// Reads the persisted seen-set off the async executor
    async fn load_seen(&self) -> SeenSet {
        let store = Arc::clone(&self.deps.store);
        match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(Ok(seen)) => seen,
            Ok(Err(e)) => {
                ::log::warn!("{}; starting with an empty seen-set", e);
                SeenSet::new()
            }
            Err(e) => {
                ::log::error!("Loading the seen-set failed: {}; starting with an empty seen-set", e);
                SeenSet::new()
            }
        }
    }

    fn lock_run(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RunState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, RunState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
