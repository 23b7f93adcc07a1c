//! Device session manager
//!
//! `DeviceSession` is the single owner of the companion-device state:
//! connection lifecycle, battery, device file listing, remote recording
//! timer, local library with folders and pins, and the music/hardware flags.
//!
//! Consumers clone the handle, read through `snapshot()` or the query
//! methods, and mutate only through the operations below. State lives behind
//! one `RwLock`; the two periodic ticks (recording seconds, battery drain)
//! each have at most one live `Ticker`, guarded by an epoch so a tick from a
//! cancelled ticker can never write.
//!
//! Lock order is `tickers` then `state`. Neither lock is held across an
//! `.await`.

use super::events::{EventBus, SessionEvent};
use super::source::DeviceSource;
use super::ticker::Ticker;
use super::types::{new_id, now_millis, ConnectionRecord, ConnectionStatus, Folder, Recording};
use crate::config::SessionConfig;
use crate::library::{self, LibraryQuery, LibraryView};
use crate::utils::recording_filename;
use crate::{Result, SmartSoundError};
use chrono::Utc;
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

const UNKNOWN_DEVICE: &str = "Unknown Device";
const RECORDING_VERSION: &str = "1.0.0";
const MIN_RECORDING_SIZE: u64 = 500_000;
const RECORDING_SIZE_SPREAD: u64 = 1_000_000;

/// Everything the session owns
#[derive(Clone, Debug, Default)]
pub(crate) struct SessionState {
    pub status: ConnectionStatus,
    /// Present only while connected
    pub device_name: Option<String>,
    pub battery_level: u8,
    /// Listing of the connected device; replaced on connect, cleared on disconnect
    pub device_files: Vec<Recording>,
    /// Survives disconnects
    pub local_recordings: Vec<Recording>,
    pub folders: Vec<Folder>,
    /// Newest first
    pub connection_history: Vec<ConnectionRecord>,
    pub is_recording: bool,
    pub recording_seconds: u32,
    pub is_music_playing: bool,
    pub music_volume: u8,
    pub button_press_duration: u32,
    /// Bumped on every recording start; ticks from older runs are ignored
    recording_epoch: u64,
    /// Bumped on every transition into CONNECTED
    connection_epoch: u64,
}

impl SessionState {
    fn new(config: &SessionConfig, source: &dyn DeviceSource) -> Self {
        Self {
            battery_level: config.initial_battery,
            local_recordings: source.initial_library(),
            folders: source.initial_folders(),
            connection_history: source.initial_history(),
            music_volume: config.initial_volume,
            button_press_duration: config.button_press_duration_secs,
            ..Self::default()
        }
    }

    pub fn is_synced(&self, file_id: &str) -> bool {
        self.local_recordings.iter().any(|r| r.id == file_id)
    }

    fn local_mut(&mut self, id: &str) -> Option<&mut Recording> {
        self.local_recordings.iter_mut().find(|r| r.id == id)
    }

    /// Create an immutable snapshot of current state
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            device_name: self.device_name.clone(),
            battery_level: self.battery_level,
            device_files: self.device_files.clone(),
            local_recordings: self.local_recordings.clone(),
            folders: self.folders.clone(),
            connection_history: self.connection_history.clone(),
            is_recording: self.is_recording,
            recording_seconds: self.recording_seconds,
            is_music_playing: self.is_music_playing,
            music_volume: self.music_volume,
            button_press_duration: self.button_press_duration,
        }
    }
}

/// Immutable copy of session state handed to consumers
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub device_name: Option<String>,
    pub battery_level: u8,
    pub device_files: Vec<Recording>,
    pub local_recordings: Vec<Recording>,
    pub folders: Vec<Folder>,
    pub connection_history: Vec<ConnectionRecord>,
    pub is_recording: bool,
    pub recording_seconds: u32,
    pub is_music_playing: bool,
    pub music_volume: u8,
    pub button_press_duration: u32,
}

impl SessionSnapshot {
    pub fn is_synced(&self, file_id: &str) -> bool {
        self.local_recordings.iter().any(|r| r.id == file_id)
    }

    pub fn unsynced_device_files(&self) -> Vec<&Recording> {
        self.device_files
            .iter()
            .filter(|f| !self.is_synced(&f.id))
            .collect()
    }

    pub fn library_view(&self, query: &LibraryQuery) -> LibraryView {
        query.apply(&self.local_recordings, &self.folders)
    }
}

#[derive(Default)]
struct Tickers {
    recording: Option<Ticker>,
    battery: Option<Ticker>,
}

struct Inner {
    config: SessionConfig,
    source: Arc<dyn DeviceSource>,
    state: RwLock<SessionState>,
    tickers: Mutex<Tickers>,
    events: EventBus,
    scan_in_flight: AtomicBool,
}

/// Clears the scan guard however the scan future ends
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to the device session; clones share the same state
#[derive(Clone)]
pub struct DeviceSession {
    inner: Arc<Inner>,
}

impl DeviceSession {
    pub fn new(config: SessionConfig, source: impl DeviceSource + 'static) -> Self {
        Self::with_source(config, Arc::new(source))
    }

    /// Like `new`, but refuses a config that fails `SessionConfig::validate`
    pub fn try_new(config: SessionConfig, source: impl DeviceSource + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config, source))
    }

    pub fn with_source(config: SessionConfig, source: Arc<dyn DeviceSource>) -> Self {
        let state = SessionState::new(&config, source.as_ref());
        let events = EventBus::with_capacity(config.event_buffer);
        Self {
            inner: Arc::new(Inner {
                config,
                source,
                state: RwLock::new(state),
                tickers: Mutex::new(Tickers::default()),
                events,
                scan_in_flight: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Receive change notifications from this session
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        self.inner.events.emit(event);
    }

    // === Reads ===

    /// Get a snapshot of current state (no lock held after return)
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.read().snapshot()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.read().status
    }

    pub fn device_name(&self) -> Option<String> {
        self.inner.state.read().device_name.clone()
    }

    pub fn battery_level(&self) -> u8 {
        self.inner.state.read().battery_level
    }

    pub fn is_recording(&self) -> bool {
        self.inner.state.read().is_recording
    }

    pub fn recording_seconds(&self) -> u32 {
        self.inner.state.read().recording_seconds
    }

    pub fn device_files(&self) -> Vec<Recording> {
        self.inner.state.read().device_files.clone()
    }

    pub fn local_recordings(&self) -> Vec<Recording> {
        self.inner.state.read().local_recordings.clone()
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.inner.state.read().folders.clone()
    }

    pub fn connection_history(&self) -> Vec<ConnectionRecord> {
        self.inner.state.read().connection_history.clone()
    }

    /// Current copy of a local recording, re-read on every call
    pub fn recording(&self, id: &str) -> Option<Recording> {
        self.inner
            .state
            .read()
            .local_recordings
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn device_file(&self, id: &str) -> Option<Recording> {
        self.inner
            .state
            .read()
            .device_files
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// True iff a recording with this id is in the local library
    pub fn check_is_synced(&self, file_id: &str) -> bool {
        self.inner.state.read().is_synced(file_id)
    }

    pub fn library_view(&self, query: &LibraryQuery) -> LibraryView {
        let state = self.inner.state.read();
        query.apply(&state.local_recordings, &state.folders)
    }

    pub fn folder_item_count(&self, folder_id: &str) -> usize {
        library::folder_item_count(&self.inner.state.read().local_recordings, folder_id)
    }

    pub fn is_folder_empty(&self, folder_id: &str) -> bool {
        self.folder_item_count(folder_id) == 0
    }

    // === Connection lifecycle ===

    /// Drive DISCONNECTED -> SCANNING -> CONNECTING -> CONNECTED.
    ///
    /// Resolves once CONNECTED is reached. A second call while a scan is
    /// still running is rejected with `ScanInProgress`. Calling it while
    /// already connected starts a fresh cycle.
    pub async fn scan_for_devices(&self) -> Result<()> {
        if self.inner.scan_in_flight.swap(true, Ordering::SeqCst) {
            warn!("Scan requested while another scan is running");
            return Err(SmartSoundError::ScanInProgress);
        }
        let _guard = ScanGuard(&self.inner.scan_in_flight);

        info!("Scanning for devices");
        self.transition(ConnectionStatus::Scanning);
        tokio::time::sleep(self.inner.config.scan_delay()).await;

        self.transition(ConnectionStatus::Connecting);
        tokio::time::sleep(self.inner.config.connect_delay()).await;

        let name = self.inner.source.device_name();
        let files = self.inner.source.fetch_device_files();
        {
            let mut tickers = self.inner.tickers.lock();
            let epoch = {
                let mut state = self.inner.state.write();
                state.status = ConnectionStatus::Connected;
                state.device_name = Some(name.clone());
                state.device_files = files;
                state
                    .connection_history
                    .insert(0, ConnectionRecord::new(name.clone()));
                state.connection_epoch += 1;
                state.connection_epoch
            };
            tickers.battery = self.spawn_battery_ticker(epoch);
        }

        info!(device = %name, "Device connected");
        self.emit(SessionEvent::StatusChanged(ConnectionStatus::Connected));
        self.emit(SessionEvent::DeviceFilesChanged);
        Ok(())
    }

    /// Reset to DISCONNECTED from any state. Always succeeds.
    pub fn disconnect(&self) {
        {
            let mut tickers = self.inner.tickers.lock();
            let mut state = self.inner.state.write();
            state.status = ConnectionStatus::Disconnected;
            state.device_name = None;
            state.device_files.clear();
            state.is_recording = false;
            state.recording_seconds = 0;
            state.is_music_playing = false;
            tickers.recording = None;
            tickers.battery = None;
        }

        info!("Device disconnected");
        self.emit(SessionEvent::StatusChanged(ConnectionStatus::Disconnected));
        self.emit(SessionEvent::DeviceFilesChanged);
    }

    /// Move to a non-connected status, stopping the battery drain
    fn transition(&self, status: ConnectionStatus) {
        debug_assert!(!status.is_connected());
        {
            let mut tickers = self.inner.tickers.lock();
            self.inner.state.write().status = status;
            tickers.battery = None;
        }
        debug!(%status, "Connection status changed");
        self.emit(SessionEvent::StatusChanged(status));
    }

    fn spawn_battery_ticker(&self, epoch: u64) -> Option<Ticker> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let result = Ticker::spawn("battery", self.inner.config.battery_tick(), move || {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            let level = {
                let mut state = inner.state.write();
                if state.connection_epoch != epoch || !state.status.is_connected() {
                    return false;
                }
                state.battery_level = state.battery_level.saturating_sub(1);
                state.battery_level
            };
            debug!(level, "Battery drained");
            inner.events.emit(SessionEvent::BatteryChanged(level));
            true
        });

        match result {
            Ok(ticker) => Some(ticker),
            Err(e) => {
                warn!(error = %e, "Battery drain not started");
                None
            }
        }
    }

    // === Remote recording ===

    /// Flip the recording flag; returns the new flag.
    ///
    /// Starting resets the elapsed counter, starts the per-second tick and
    /// pauses music. Stopping cancels the tick and, when connected, prepends
    /// a new file (at least one second long) to the device listing.
    pub fn toggle_recording(&self) -> Result<bool> {
        let mut tickers = self.inner.tickers.lock();
        let mut state = self.inner.state.write();

        if !state.is_recording {
            state.recording_epoch += 1;
            let ticker = self.spawn_recording_ticker(state.recording_epoch)?;
            tickers.recording = Some(ticker);

            state.is_recording = true;
            state.recording_seconds = 0;
            let paused_music = std::mem::replace(&mut state.is_music_playing, false);
            drop(state);
            drop(tickers);

            info!("Recording started");
            self.emit(SessionEvent::RecordingStarted);
            if paused_music {
                self.emit(SessionEvent::MusicChanged);
            }
            return Ok(true);
        }

        tickers.recording = None;
        state.is_recording = false;

        let mut file_id = None;
        if state.status.is_connected() {
            let file = Recording {
                version: Some(RECORDING_VERSION.to_string()),
                ..Recording::new(
                    new_id(),
                    recording_filename(Utc::now()),
                    state.recording_seconds.max(1),
                    now_millis(),
                    MIN_RECORDING_SIZE + rand::thread_rng().gen_range(0..RECORDING_SIZE_SPREAD),
                    state
                        .device_name
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_DEVICE.to_string()),
                )
            };
            info!(
                file = %file.filename,
                duration_sec = file.duration_sec,
                "Recording stopped, file added to device"
            );
            file_id = Some(file.id.clone());
            state.device_files.insert(0, file);
            state.recording_seconds = 0;
        } else {
            info!("Recording stopped while not connected, nothing saved");
        }
        drop(state);
        drop(tickers);

        self.emit(SessionEvent::RecordingStopped {
            file_id: file_id.clone(),
        });
        if file_id.is_some() {
            self.emit(SessionEvent::DeviceFilesChanged);
        }
        Ok(false)
    }

    fn spawn_recording_ticker(&self, epoch: u64) -> Result<Ticker> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Ticker::spawn("recording", self.inner.config.recording_tick(), move || {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            let seconds = {
                let mut state = inner.state.write();
                if state.recording_epoch != epoch || !state.is_recording {
                    return false;
                }
                state.recording_seconds += 1;
                state.recording_seconds
            };
            inner.events.emit(SessionEvent::RecordingTick(seconds));
            true
        })
    }

    // === Sync ===

    /// Copy a device file into the local library root.
    ///
    /// Returns whether a copy was inserted. Already-synced ids are a no-op,
    /// checked both before the transfer delay and again at insertion so
    /// overlapping calls for the same id insert once.
    pub async fn sync_file(&self, file: &Recording) -> bool {
        if self.check_is_synced(&file.id) {
            debug!(file_id = %file.id, "Already synced");
            return false;
        }

        tokio::time::sleep(self.inner.config.sync_delay()).await;

        {
            let mut state = self.inner.state.write();
            if state.is_synced(&file.id) {
                debug!(file_id = %file.id, "Synced concurrently");
                return false;
            }
            let copy = Recording {
                folder_id: None,
                ..file.clone()
            };
            state.local_recordings.insert(0, copy);
        }

        info!(file_id = %file.id, filename = %file.filename, "File synced");
        self.emit(SessionEvent::FileSynced {
            file_id: file.id.clone(),
        });
        self.emit(SessionEvent::LibraryChanged);
        true
    }

    /// Sync every device file not yet in the library, one at a time in
    /// listing order. Returns the number of files inserted.
    pub async fn sync_all(&self) -> usize {
        let pending: Vec<Recording> = {
            let state = self.inner.state.read();
            state
                .device_files
                .iter()
                .filter(|f| !state.is_synced(&f.id))
                .cloned()
                .collect()
        };
        info!(count = pending.len(), "Syncing all device files");
        self.sync_sequentially(pending).await
    }

    /// Sync the listed device files in listing order
    pub async fn sync_selected(&self, ids: &[String]) -> usize {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let selected: Vec<Recording> = self
            .inner
            .state
            .read()
            .device_files
            .iter()
            .filter(|f| wanted.contains(f.id.as_str()))
            .cloned()
            .collect();
        self.sync_sequentially(selected).await
    }

    async fn sync_sequentially(&self, files: Vec<Recording>) -> usize {
        let mut inserted = 0;
        for file in &files {
            if self.sync_file(file).await {
                inserted += 1;
            }
        }
        inserted
    }

    // === Device listing ===

    /// Remove from the device listing only; synced copies are untouched
    pub fn delete_device_file(&self, id: &str) {
        self.delete_device_files(&[id.to_string()]);
    }

    pub fn delete_device_files(&self, ids: &[String]) {
        let removed = {
            let mut state = self.inner.state.write();
            let before = state.device_files.len();
            state.device_files.retain(|f| !ids.contains(&f.id));
            before - state.device_files.len()
        };
        if removed > 0 {
            info!(removed, "Device files deleted");
            self.emit(SessionEvent::DeviceFilesChanged);
        }
    }

    // === Local library ===

    pub fn delete_local_recording(&self, id: &str) {
        self.delete_local_recordings(&[id.to_string()]);
    }

    pub fn delete_local_recordings(&self, ids: &[String]) {
        let removed = {
            let mut state = self.inner.state.write();
            let before = state.local_recordings.len();
            state.local_recordings.retain(|r| !ids.contains(&r.id));
            before - state.local_recordings.len()
        };
        if removed > 0 {
            info!(removed, "Local recordings deleted");
            self.emit(SessionEvent::LibraryChanged);
        }
    }

    /// Name is stored as given; uniqueness and emptiness are the caller's concern
    pub fn rename_local_recording(&self, id: &str, new_name: &str) {
        let renamed = match self.inner.state.write().local_mut(id) {
            Some(rec) => {
                rec.filename = new_name.to_string();
                true
            }
            None => false,
        };
        if renamed {
            self.emit(SessionEvent::LibraryChanged);
        } else {
            debug!(id, "Rename ignored, no such recording");
        }
    }

    pub fn toggle_pin_recording(&self, id: &str) {
        let pinned = self.inner.state.write().local_mut(id).map(|rec| {
            rec.is_pinned = !rec.is_pinned;
            rec.is_pinned
        });
        match pinned {
            Some(pinned) => {
                debug!(id, pinned, "Pin toggled");
                self.emit(SessionEvent::LibraryChanged);
            }
            None => debug!(id, "Pin ignored, no such recording"),
        }
    }

    // === Folders ===

    /// Create a folder at the head of the list; names are not de-duplicated
    pub fn create_folder(&self, name: &str) -> Folder {
        let folder = Folder::new(name);
        self.inner.state.write().folders.insert(0, folder.clone());
        info!(id = %folder.id, name, "Folder created");
        self.emit(SessionEvent::FoldersChanged);
        folder
    }

    /// Remove the folder entry without touching its members.
    ///
    /// Recordings still pointing at it keep a dangling `folder_id`; use
    /// `try_delete_folder` to refuse non-empty folders instead.
    pub fn delete_folder(&self, folder_id: &str) {
        let (removed, dangling) = {
            let mut state = self.inner.state.write();
            let before = state.folders.len();
            state.folders.retain(|f| f.id != folder_id);
            let dangling = library::folder_item_count(&state.local_recordings, folder_id);
            (before != state.folders.len(), dangling)
        };
        if !removed {
            return;
        }
        if dangling > 0 {
            warn!(folder_id, dangling, "Folder deleted while still referenced");
        }
        self.emit(SessionEvent::FoldersChanged);
    }

    /// Delete a folder only if it exists and nothing references it
    pub fn try_delete_folder(&self, folder_id: &str) -> Result<()> {
        {
            let mut state = self.inner.state.write();
            if !state.folders.iter().any(|f| f.id == folder_id) {
                return Err(SmartSoundError::FolderNotFound(folder_id.to_string()));
            }
            if library::folder_item_count(&state.local_recordings, folder_id) > 0 {
                return Err(SmartSoundError::FolderNotEmpty(folder_id.to_string()));
            }
            state.folders.retain(|f| f.id != folder_id);
        }
        info!(folder_id, "Folder deleted");
        self.emit(SessionEvent::FoldersChanged);
        Ok(())
    }

    /// Set `folder_id` on every listed recording in one update; `None` moves
    /// them to the root. Unknown ids are ignored. Returns how many moved.
    pub fn move_recordings_to_folder(&self, ids: &[String], folder_id: Option<&str>) -> usize {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let moved = {
            let mut state = self.inner.state.write();
            let mut moved = 0;
            for rec in state
                .local_recordings
                .iter_mut()
                .filter(|r| wanted.contains(r.id.as_str()))
            {
                rec.folder_id = folder_id.map(str::to_string);
                moved += 1;
            }
            moved
        };
        debug!(moved, folder = ?folder_id, "Recordings moved");
        if moved > 0 {
            self.emit(SessionEvent::LibraryChanged);
        }
        moved
    }

    /// Like `move_recordings_to_folder`, but refuses an unknown target folder
    pub fn move_recordings_to_folder_checked(
        &self,
        ids: &[String],
        folder_id: Option<&str>,
    ) -> Result<usize> {
        if let Some(target) = folder_id {
            let exists = self.inner.state.read().folders.iter().any(|f| f.id == target);
            if !exists {
                return Err(SmartSoundError::FolderNotFound(target.to_string()));
            }
        }
        Ok(self.move_recordings_to_folder(ids, folder_id))
    }

    // === Music & hardware settings ===

    pub fn toggle_music_play(&self) -> bool {
        let playing = {
            let mut state = self.inner.state.write();
            state.is_music_playing = !state.is_music_playing;
            state.is_music_playing
        };
        info!(playing, "Command: toggle music playback");
        self.emit(SessionEvent::MusicChanged);
        playing
    }

    pub fn play_next_track(&self) {
        info!("Command: next track");
    }

    pub fn play_prev_track(&self) {
        info!("Command: previous track");
    }

    /// Stored clamped to 0-100
    pub fn set_music_volume(&self, level: u8) {
        let level = level.min(100);
        self.inner.state.write().music_volume = level;
        debug!(level, "Command: set music volume");
        self.emit(SessionEvent::MusicChanged);
    }

    pub fn set_button_press_duration(&self, seconds: u32) {
        self.inner.state.write().button_press_duration = seconds;
        info!(seconds, "Command: set hardware rec duration");
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("DeviceSession")
            .field("status", &state.status)
            .field("device_name", &state.device_name)
            .field("is_recording", &state.is_recording)
            .field("events", &self.inner.events)
            .finish()
    }
}
