//! Configuration client for one project/environment binding.
//!
//! [`Client`] keeps an in-memory copy of the authority's key set, polls for
//! new versions in the background and reports every applied difference as a
//! [`ChangeEvent`].

mod changes;
mod delivery;
mod sync;


pub use changes::{Change, ChangeEvent, ChangeKind};
pub use delivery::{CHANGE_BUFFER_SIZE, ChangeStream};

use std::{
    any::Any,
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, MutexGuard},
};

use futures::StreamExt;
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    RccError, Result,
    config::Conf,
    poller::Poller,
    transport::{HttpRequester, Requester},
};

use sync::SyncEngine;

/// Resources owned by one `start()`/`stop()` cycle.
struct Session {
    cancel: CancellationToken,
    poller: Arc<Poller>,
    _task: Option<JoinHandle<()>>,
    _permit: OwnedSemaphorePermit,
}

/// Keeps a local configuration snapshot in sync with the authority.
///
/// Reads are synchronous and served from memory. Only one start/stop cycle
/// may be active at a time.
///
/// ```rust,no_run
/// use rcc_client::{client::Client, config::Conf};
///
/// # async fn run() -> rcc_client::Result<()> {
/// let conf = Conf::from_file(std::path::Path::new("rcc.toml"))?;
/// let client = Client::new(conf)?;
/// client.start().await?;
///
/// let url = client.get_value("db.url", "postgres://localhost");
/// # let _ = url;
/// client.stop();
/// # Ok(())
/// # }
/// ```
pub struct Client {
    engine: Arc<SyncEngine>,
    gate: Arc<Semaphore>,
    session: Mutex<Option<Session>>,
}

impl Client {
    /// Creates a client talking HTTP to the configured authority.
    ///
    /// # Errors
    /// * `RccError::InvalidConfig` - If the configuration does not normalize
    /// * `RccError::Transport` - If the HTTP client cannot be built
    pub fn new(conf: Conf) -> Result<Self> {
        let conf = conf.normalize()?;
        let requester = Arc::new(HttpRequester::new(&conf)?);
        Ok(Self::build(conf, requester))
    }

    /// Creates a client using a custom transport.
    ///
    /// # Errors
    /// Returns `RccError::InvalidConfig` if the configuration does not normalize.
    pub fn with_requester(conf: Conf, requester: Arc<dyn Requester>) -> Result<Self> {
        let conf = conf.normalize()?;
        Ok(Self::build(conf, requester))
    }

    fn build(conf: Conf, requester: Arc<dyn Requester>) -> Self {
        Self {
            engine: Arc::new(SyncEngine::new(conf, requester)),
            gate: Arc::new(Semaphore::new(1)),
            session: Mutex::new(None),
        }
    }

    /// The normalized configuration.
    pub fn conf(&self) -> &Conf {
        &self.engine.conf
    }

    /// Returns `true` between a successful `start()` and the matching `stop()`.
    ///
    /// A `start()` that is still preloading does not count as running.
    pub fn is_running(&self) -> bool {
        lock(&self.session).is_some()
    }

    /// Loads the initial configuration and, when callbacks are enabled,
    /// starts background polling.
    ///
    /// Falls back to the persisted snapshot when the authority cannot be
    /// reached and the disk cache is enabled. The subscriber stream is reset,
    /// so subscribe after this call returns.
    ///
    /// # Errors
    /// * `RccError::AlreadyRunning` - If a previous `start()` is still active
    /// * The preload error when no usable fallback exists
    #[instrument(skip(self), fields(project = %self.engine.conf.project_name, env = %self.engine.conf.env_name))]
    pub async fn start(&self) -> Result<()> {
        let permit = Arc::clone(&self.gate)
            .try_acquire_owned()
            .map_err(|_| RccError::AlreadyRunning)?;

        let cancel = CancellationToken::new();
        self.engine.delivery.reset(cancel.clone());

        let poller = Arc::new(Poller::new(
            Arc::clone(&self.engine.requester),
            self.engine.clone(),
            self.engine.conf.callback_interval(),
            cancel.child_token(),
        ));

        self.preload(&poller).await?;
        info!("Preload success");

        let task = if self.engine.conf.enable_callback {
            info!("Enable update callback");
            let poller = Arc::clone(&poller);
            Some(tokio::spawn(async move { poller.run().await }))
        } else {
            None
        };

        *lock(&self.session) = Some(Session {
            cancel,
            poller,
            _task: task,
            _permit: permit,
        });

        Ok(())
    }

    /// Stops polling, closes the change stream and releases the running gate.
    ///
    /// Must follow a successful `start()`; otherwise this is a no-op.
    pub fn stop(&self) {
        let Some(session) = lock(&self.session).take() else {
            debug!("Stop requested on a client that is not running");
            return;
        };

        session.poller.stop();
        session.cancel.cancel();
        self.engine.delivery.close();

        info!(
            project = %self.engine.conf.project_name,
            env = %self.engine.conf.env_name,
            "Client stopped"
        );
    }

    /// Returns the stream of change events.
    ///
    /// The stream yields one event per applied version that changed at least
    /// one key and ends when the client stops.
    ///
    /// # Errors
    /// Returns `RccError::AlreadySubscribed` while another stream is alive.
    pub fn watch_update(&self) -> Result<ChangeStream> {
        self.engine.delivery.subscribe()
    }

    /// Invokes `callback` for every change event on a dedicated task.
    ///
    /// A panic inside the callback is caught and logged; later events are
    /// still delivered.
    ///
    /// # Errors
    /// Returns `RccError::AlreadySubscribed` while another stream is alive.
    pub fn watch<F>(&self, callback: F) -> Result<JoinHandle<()>>
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        let mut stream = self.watch_update()?;
        let project = self.engine.conf.project_name.clone();
        let env = self.engine.conf.env_name.clone();

        Ok(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
                    error!(
                        project = %project,
                        env = %env,
                        panic = %panic_message(panic.as_ref()),
                        "Watch callback panicked"
                    );
                }
            }
            debug!(project = %project, env = %env, "Change stream closed");
        }))
    }

    /// Returns the value of `key`, or `default` when it is missing or empty.
    pub fn get_value(&self, key: &str, default: &str) -> String {
        match self.engine.cache.get(key) {
            Some(value) if !value.is_empty() => value,
            _ => default.to_string(),
        }
    }

    /// All known keys, in no particular order.
    pub fn get_all_keys(&self) -> Vec<String> {
        self.engine.cache.keys()
    }

    /// Copy of the whole configuration.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.engine.cache.dump()
    }

    async fn preload(&self, poller: &Poller) -> Result<()> {
        let err = match poller.preload().await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if !self.engine.conf.enable_cache {
            return Err(err);
        }

        let path = self.engine.paths.file();
        match self.engine.restore() {
            Ok(()) => {
                warn!(
                    error = %err,
                    path = %path.display(),
                    "Authority unavailable, preloaded from cache file"
                );
                Ok(())
            }
            Err(load_err) => {
                warn!(
                    error = %load_err,
                    path = %path.display(),
                    "Preload from cache file failed"
                );
                Err(err)
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(session) = lock(&self.session).take() {
            session.poller.stop();
            session.cancel.cancel();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
