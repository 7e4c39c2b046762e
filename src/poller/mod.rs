//! Version polling against the configuration authority.
//!
//! The [`Poller`] only detects that the active version moved; fetching and
//! applying the new key set is delegated to an [`UpdateHandler`].


use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    Result,
    transport::{Requester, VersionId},
};

/// Why a version is being synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOrigin {
    /// Initial load at startup; the result is ground truth and not delivered.
    Preload,
    /// The poller observed a version change.
    Update,
}

/// Receives versions the poller wants applied.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// Fetches and applies `version`.
    ///
    /// # Errors
    /// Returns the fetch error; the poller then keeps its last known version.
    async fn handle_update(&self, version: VersionId, origin: SyncOrigin) -> Result<()>;
}

/// Lifecycle of a [`Poller`].
///
/// `Idle -> Preloaded -> Polling -> Stopped`. A stopped poller never runs
/// again; a fresh one is needed to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Created, nothing loaded yet.
    Idle,
    /// Initial version applied.
    Preloaded,
    /// Background loop running.
    Polling,
    /// Terminal.
    Stopped,
}

/// Periodically checks the active version and reports changes.
pub struct Poller {
    requester: Arc<dyn Requester>,
    handler: Arc<dyn UpdateHandler>,
    interval: Duration,
    cancel: CancellationToken,
    state: Mutex<PollerState>,
    last_version: Mutex<Option<VersionId>>,
}

impl Poller {
    /// Creates an idle poller.
    ///
    /// `cancel` stops the loop; [`Poller::stop`] cancels it as well.
    pub fn new(
        requester: Arc<dyn Requester>,
        handler: Arc<dyn UpdateHandler>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            requester,
            handler,
            interval,
            cancel,
            state: Mutex::new(PollerState::Idle),
            last_version: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PollerState {
        *lock(&self.state)
    }

    /// Last version successfully applied.
    pub fn last_version(&self) -> Option<VersionId> {
        *lock(&self.last_version)
    }

    /// Resolves the active version and applies its full key set.
    ///
    /// # Errors
    /// Returns the version-check or fetch error unchanged.
    #[instrument(skip(self))]
    pub async fn preload(&self) -> Result<()> {
        let version = self.requester.active_version().await?;
        self.handler
            .handle_update(version, SyncOrigin::Preload)
            .await?;

        *lock(&self.last_version) = Some(version);

        let mut state = lock(&self.state);
        if *state == PollerState::Idle {
            *state = PollerState::Preloaded;
        }

        info!(%version, "Preloaded configuration");
        Ok(())
    }

    /// Runs the polling loop until [`Poller::stop`] is called or the
    /// cancellation token fires.
    ///
    /// The first check happens one interval after the call. A failed check is
    /// logged and retried on the next tick. Returns immediately when the
    /// poller is already running or stopped.
    pub async fn run(&self) {
        {
            let mut state = lock(&self.state);
            match *state {
                PollerState::Polling | PollerState::Stopped => {
                    debug!(state = ?*state, "Poller not started");
                    return;
                }
                PollerState::Idle | PollerState::Preloaded => *state = PollerState::Polling,
            }
        }

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = self.interval.as_secs(), "Version polling started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        result = self.check_once() => match result {
                            Ok(true) => {}
                            Ok(false) => debug!("Active version unchanged"),
                            Err(e) => warn!(error = %e, "Version check failed"),
                        },
                    }
                }
            }
        }

        *lock(&self.state) = PollerState::Stopped;
        info!("Version polling stopped");
    }

    /// Stops the loop. Safe to call at any time, including before `run`.
    pub fn stop(&self) {
        self.cancel.cancel();
        *lock(&self.state) = PollerState::Stopped;
    }

    /// Performs one version check and applies the version when it moved.
    ///
    /// Returns `true` when an update was applied.
    ///
    /// # Errors
    /// Returns the version-check or fetch error; the last known version is kept.
    pub async fn check_once(&self) -> Result<bool> {
        let version = self.requester.active_version().await?;
        let last = self.last_version();

        if last == Some(version) {
            return Ok(false);
        }

        info!(
            from = ?last.map(|v| v.0),
            to = %version,
            "Active version changed"
        );

        self.handler
            .handle_update(version, SyncOrigin::Update)
            .await?;
        *lock(&self.last_version) = Some(version);

        Ok(true)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
