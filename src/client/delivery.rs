use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ChangeEvent;
use crate::{RccError, Result};

/// Capacity of the subscriber channel.
pub const CHANGE_BUFFER_SIZE: usize = 32;

/// Stream of change events handed to the single subscriber.
///
/// Ends when the client stops or its session is cancelled.
pub type ChangeStream = ReceiverStream<ChangeEvent>;

/// Single-subscriber delivery slot.
///
/// The channel only exists once a subscriber asked for it; until then events
/// are dropped. End of stream is signalled by dropping the sender.
pub(crate) struct Delivery {
    sender: Mutex<Option<mpsc::Sender<ChangeEvent>>>,
    cancel: Mutex<CancellationToken>,
}

impl Delivery {
    pub(crate) fn new() -> Self {
        Self {
            sender: Mutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Forgets the previous subscriber and binds delivery to a new session.
    pub(crate) fn reset(&self, cancel: CancellationToken) {
        *lock(&self.sender) = None;
        *lock(&self.cancel) = cancel;
    }

    /// Creates the channel and returns its receiving end.
    ///
    /// A subscriber that dropped its stream may be replaced.
    pub(crate) fn subscribe(&self) -> Result<ChangeStream> {
        let mut sender = lock(&self.sender);
        if sender.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(RccError::AlreadySubscribed);
        }

        let (tx, rx) = mpsc::channel(CHANGE_BUFFER_SIZE);
        *sender = Some(tx);
        Ok(ReceiverStream::new(rx))
    }

    /// Closes the stream of the current subscriber.
    pub(crate) fn close(&self) {
        *lock(&self.sender) = None;
    }

    /// Hands `event` to the subscriber, waiting for buffer space.
    ///
    /// If the session is cancelled while waiting, the channel is closed
    /// instead and the event is dropped.
    pub(crate) async fn deliver(&self, event: ChangeEvent) {
        let sender = lock(&self.sender).clone();
        let Some(tx) = sender else {
            debug!(changes = event.len(), "No subscriber, change event dropped");
            return;
        };
        let cancel = lock(&self.cancel).clone();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Session cancelled during delivery, closing change stream");
                self.close();
            }
            sent = tx.send(event) => {
                if sent.is_err() {
                    warn!("Change subscriber went away, closing change stream");
                    self.close();
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
