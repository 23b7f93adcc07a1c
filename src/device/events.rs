//! Change notifications emitted by the device session
//!
//! State should be queried from the session itself; events only tell a
//! consumer that something worth re-reading has changed.

use super::types::ConnectionStatus;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::trace;

/// Per-subscriber queue length used by `EventBus::new`
pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connection status moved to a new state
    StatusChanged(ConnectionStatus),
    /// Battery level changed (percent)
    BatteryChanged(u8),
    /// Remote recording started on the device
    RecordingStarted,
    /// Elapsed recording seconds advanced
    RecordingTick(u32),
    /// Remote recording stopped; carries the new device file id if one was created
    RecordingStopped { file_id: Option<String> },
    /// Device file listing replaced, extended, or trimmed
    DeviceFilesChanged,
    /// A device file was copied into the local library
    FileSynced { file_id: String },
    /// Local library contents changed
    LibraryChanged,
    /// Folder list changed
    FoldersChanged,
    /// Music playback flag or volume changed
    MusicChanged,
}

/// Fan-out of session events to any number of subscribers.
///
/// Each subscriber gets a bounded queue. A subscriber that stops reading
/// misses new events once its queue is full; it is never blocked on and
/// never grows past `capacity`.
pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<SessionEvent>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_BUFFER)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = bounded(self.capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver to every live subscriber, dropping the ones that hung up
    pub fn emit(&self, event: SessionEvent) {
        self.subscribers
            .lock()
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(dropped)) => {
                    trace!(event = ?dropped, "Subscriber queue full, event dropped");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
