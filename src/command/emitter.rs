use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::event::BuildEvent;

/// Capacity of the queue between the driver and the UI loop
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Create a bounded event queue with its stop signal
pub fn channel(capacity: usize) -> (Emitter, EventSource) {
    let (tx, rx) = mpsc::channel(capacity);
    let stop = CancellationToken::new();
    let emitter = Emitter {
        tx,
        stop: stop.clone(),
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (emitter, EventSource { rx, stop })
}

/// Producer half: never blocks, drops events when the queue is full
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::Sender<BuildEvent>,
    stop: CancellationToken,
    dropped: Arc<AtomicU64>,
}

impl Emitter {
    /// Enqueue an event without waiting
    ///
    /// Returns whether the event was queued. After stop this is a no-op.
    pub fn emit(&self, event: BuildEvent) -> bool {
        if self.stop.is_cancelled() {
            return false;
        }
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Events discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

/// Consumer half owned by the UI loop
pub struct EventSource {
    rx: mpsc::Receiver<BuildEvent>,
    stop: CancellationToken,
}

impl EventSource {
    /// Next event, or `None` once the queue closes or stop is signalled
    pub async fn wait_for_event(&mut self) -> Option<BuildEvent> {
        if self.stop.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    /// Signal stop to the producer and to pending waits
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }
}
