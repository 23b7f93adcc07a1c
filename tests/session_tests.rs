//! Integration tests for the device session
//!
//! All async tests run on a paused tokio clock, so handshake delays, sync
//! transfers and periodic ticks advance deterministically.

use smartsound::library::{LibraryQuery, SortOption};
use smartsound::{
    ConnectionStatus, DeviceSession, DeviceSource, MockDeviceSource, Recording, SessionConfig,
    SessionEvent, SmartSoundError,
};
use std::time::Duration;

/// Source with a caller-chosen device listing and library
struct FixedSource {
    files: Vec<Recording>,
    library: Vec<Recording>,
}

impl DeviceSource for FixedSource {
    fn device_name(&self) -> String {
        "Bench Unit".to_string()
    }

    fn fetch_device_files(&self) -> Vec<Recording> {
        self.files.clone()
    }

    fn initial_library(&self) -> Vec<Recording> {
        self.library.clone()
    }
}

fn rec(id: &str) -> Recording {
    Recording::new(id, format!("{id}.wav"), 10, 1_700_000_000_000, 1000, "Bench Unit")
}

fn ids(list: &[Recording]) -> Vec<&str> {
    list.iter().map(|r| r.id.as_str()).collect()
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_scan_passes_through_every_state() {
    let session = DeviceSession::new(SessionConfig::default(), MockDeviceSource::new());
    let events = session.subscribe();
    let history_before = session.connection_history().len();

    let background = session.clone();
    let scan = tokio::spawn(async move { background.scan_for_devices().await });

    sleep_ms(1000).await;
    assert_eq!(session.status(), ConnectionStatus::Scanning);
    sleep_ms(2000).await;
    assert_eq!(session.status(), ConnectionStatus::Connecting);
    scan.await.unwrap().unwrap();
    assert_eq!(session.status(), ConnectionStatus::Connected);

    let statuses: Vec<ConnectionStatus> = events
        .try_iter()
        .filter_map(|e| match e {
            SessionEvent::StatusChanged(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ConnectionStatus::Scanning,
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected
        ]
    );

    let snapshot = session.snapshot();
    assert_eq!(snapshot.device_name.as_deref(), Some("SmartSound X1"));
    assert_eq!(snapshot.device_files.len(), 4);
    assert_eq!(snapshot.battery_level, 85);
    assert_eq!(snapshot.connection_history.len(), history_before + 1);
    assert_eq!(snapshot.connection_history[0].device_name, "SmartSound X1");
    assert_eq!(snapshot.connection_history[0].duration_minutes, None);
}

#[tokio::test(start_paused = true)]
async fn test_rescan_while_connected_starts_fresh_cycle() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();
    session.delete_device_file("1");
    assert_eq!(session.device_files().len(), 3);

    session.scan_for_devices().await.unwrap();
    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert_eq!(session.device_files().len(), 4);
    assert_eq!(session.connection_history().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_resets_everything() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();
    session.toggle_music_play();
    session.toggle_recording().unwrap();
    sleep_ms(2500).await;
    assert_eq!(session.recording_seconds(), 2);

    session.disconnect();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.device_name, None);
    assert!(snapshot.device_files.is_empty());
    assert!(!snapshot.is_recording);
    assert_eq!(snapshot.recording_seconds, 0);
    assert!(!snapshot.is_music_playing);
    assert_eq!(snapshot.local_recordings.len(), 3);

    // Recording tick is gone
    sleep_ms(5000).await;
    assert_eq!(session.recording_seconds(), 0);

    // Disconnecting again changes nothing
    session.disconnect();
    assert_eq!(session.snapshot(), snapshot);
}

#[tokio::test(start_paused = true)]
async fn test_sync_is_idempotent() {
    let session = DeviceSession::new(SessionConfig::default(), MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();

    let file = session.device_file("4").unwrap();
    assert!(!session.check_is_synced("4"));
    assert!(!session.check_is_synced("4"));

    assert!(session.sync_file(&file).await);
    assert!(session.check_is_synced("4"));
    let len = session.local_recordings().len();

    assert!(!session.sync_file(&file).await);
    assert_eq!(session.local_recordings().len(), len);
    assert_eq!(session.local_recordings()[0].id, "4");
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_syncs_insert_once() {
    let source = FixedSource {
        files: vec![rec("a")],
        library: Vec::new(),
    };
    let session = DeviceSession::new(SessionConfig::default(), source);
    let file = rec("a");

    let (first, second) = tokio::join!(session.sync_file(&file), session.sync_file(&file));

    assert!(first ^ second);
    assert_eq!(ids(&session.local_recordings()), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_recording_round_trip() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();
    let events = session.subscribe();

    assert!(session.toggle_recording().unwrap());
    sleep_ms(3500).await;
    assert_eq!(session.recording_seconds(), 3);
    assert!(!session.toggle_recording().unwrap());

    let files = session.device_files();
    assert_eq!(files.len(), 5);
    let newest = &files[0];
    assert_eq!(newest.duration_sec, 3);
    assert_eq!(newest.source, "SmartSound X1");
    assert!(newest.filename.starts_with("REC_") && newest.filename.ends_with(".wav"));
    assert!((500_000..1_500_000).contains(&newest.size_bytes));
    assert!(newest.tags.is_empty());
    assert!(newest.folder_id.is_none());
    assert_eq!(newest.version.as_deref(), Some("1.0.0"));
    assert_eq!(session.recording_seconds(), 0);

    let stopped = events.try_iter().find_map(|e| match e {
        SessionEvent::RecordingStopped { file_id } => file_id,
        _ => None,
    });
    assert_eq!(stopped.as_deref(), Some(newest.id.as_str()));

    // Tick cancelled with the stop
    sleep_ms(3000).await;
    assert_eq!(session.recording_seconds(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_stop_yields_one_second() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();

    session.toggle_recording().unwrap();
    session.toggle_recording().unwrap();

    assert_eq!(session.device_files()[0].duration_sec, 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_recording_has_single_tick() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();

    session.toggle_recording().unwrap();
    sleep_ms(1500).await;
    session.toggle_recording().unwrap();
    session.toggle_recording().unwrap();
    sleep_ms(2500).await;

    assert_eq!(session.recording_seconds(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_idle_subscriber_queue_stays_bounded() {
    let config = SessionConfig::instant().with_event_buffer(16);
    let session = DeviceSession::new(config, MockDeviceSource::new());
    let idle = session.subscribe();
    session.scan_for_devices().await.unwrap();

    session.toggle_recording().unwrap();
    sleep_ms(3_600_500).await;

    assert_eq!(session.recording_seconds(), 3600);
    assert_eq!(idle.len(), 16);

    // Oldest events are kept, later ticks were dropped
    let queued: Vec<_> = idle.try_iter().collect();
    assert_eq!(
        queued.first(),
        Some(&SessionEvent::StatusChanged(ConnectionStatus::Scanning))
    );
    assert!(!queued.contains(&SessionEvent::RecordingTick(3600)));

    // Room freed by draining lets the stop event through
    session.toggle_recording().unwrap();
    assert!(idle
        .try_iter()
        .any(|e| matches!(e, SessionEvent::RecordingStopped { file_id: Some(_) })));
}

#[tokio::test(start_paused = true)]
async fn test_move_recordings_to_folder() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    let folder = session.create_folder("Trips");
    let before = session.local_recordings();

    let moved = session.move_recordings_to_folder(
        &strings(&["1", "3", "zzz"]),
        Some(folder.id.as_str()),
    );
    assert_eq!(moved, 2);

    for (old, new) in before.iter().zip(session.local_recordings()) {
        if old.id == "1" || old.id == "3" {
            assert_eq!(new.folder_id.as_deref(), Some(folder.id.as_str()));
        } else {
            assert_eq!(&new, old);
        }
    }

    session.move_recordings_to_folder(&strings(&["1", "3"]), None);
    assert_eq!(session.local_recordings(), before);
}

#[tokio::test(start_paused = true)]
async fn test_pinned_recordings_sort_first() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    // Smallest, shortest and oldest of the seed library
    session.toggle_pin_recording("2");
    session.toggle_pin_recording("1");

    for sort in [SortOption::Date, SortOption::Size, SortOption::Duration] {
        let view = session.library_view(&LibraryQuery::root().sorted_by(sort));
        let pinned: Vec<bool> = view.recordings.iter().map(|r| r.is_pinned).collect();
        assert_eq!(pinned, vec![true, true, false], "sort {sort:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_sync_all_scenario() {
    let source = FixedSource {
        files: vec![rec("A"), rec("B"), rec("C")],
        library: vec![rec("B")],
    };
    let session = DeviceSession::new(SessionConfig::default(), source);
    session.scan_for_devices().await.unwrap();

    let inserted = session.sync_all().await;

    assert_eq!(inserted, 2);
    assert_eq!(ids(&session.local_recordings()), vec!["C", "A", "B"]);
    for id in ["A", "B", "C"] {
        assert!(session.check_is_synced(id));
    }
}

#[tokio::test(start_paused = true)]
async fn test_sync_all_skips_files_synced_midway() {
    let source = FixedSource {
        files: vec![rec("A"), rec("B"), rec("C")],
        library: Vec::new(),
    };
    let session = DeviceSession::new(SessionConfig::default(), source);
    session.scan_for_devices().await.unwrap();

    let background = session.clone();
    let all = tokio::spawn(async move { background.sync_all().await });
    sleep_ms(100).await;
    assert!(session.sync_file(&rec("C")).await);

    assert_eq!(all.await.unwrap(), 2);
    let library = session.local_recordings();
    assert_eq!(library.len(), 3);
    assert_eq!(library.iter().filter(|r| r.id == "C").count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sync_selected_and_device_delete() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();
    session.delete_local_recordings(&strings(&["1", "2", "3"]));

    let inserted = session.sync_selected(&strings(&["4", "2"])).await;
    assert_eq!(inserted, 2);
    assert_eq!(ids(&session.local_recordings()), vec!["4", "2"]);

    session.delete_device_files(&strings(&["2", "4"]));
    assert_eq!(ids(&session.device_files()), vec!["1", "3"]);
    assert!(session.check_is_synced("2"));
    assert!(session.check_is_synced("4"));
}

#[tokio::test(start_paused = true)]
async fn test_battery_drain_scenario() {
    let session = DeviceSession::new(SessionConfig::default(), MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();
    assert_eq!(session.battery_level(), 85);

    sleep_ms(3 * 60_000 + 30_000).await;
    assert_eq!(session.battery_level(), 82);

    session.disconnect();
    sleep_ms(10 * 60_000).await;
    assert_eq!(session.battery_level(), 82);
}

#[tokio::test(start_paused = true)]
async fn test_battery_floors_at_zero() {
    let config = SessionConfig::instant()
        .with_tick_periods(1000, 1000)
        .with_initial_battery(2);
    let session = DeviceSession::new(config, MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();

    sleep_ms(5500).await;
    assert_eq!(session.battery_level(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_battery_paused_during_rescan() {
    let config = SessionConfig::default().with_tick_periods(1000, 1000);
    let session = DeviceSession::new(config, MockDeviceSource::new());
    session.scan_for_devices().await.unwrap();
    sleep_ms(2500).await;
    assert_eq!(session.battery_level(), 83);

    // 3.5s of scanning/connecting without drain, then one more tick
    session.scan_for_devices().await.unwrap();
    assert_eq!(session.battery_level(), 83);
    sleep_ms(1500).await;
    assert_eq!(session.battery_level(), 82);
}

#[tokio::test(start_paused = true)]
async fn test_folder_delete_does_not_cascade() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    let folder = session.create_folder("F");
    session.move_recordings_to_folder(&strings(&["2"]), Some(folder.id.as_str()));

    session.delete_folder(&folder.id);

    assert!(session.folders().iter().all(|f| f.id != folder.id));
    assert_eq!(
        session.recording("2").unwrap().folder_id.as_deref(),
        Some(folder.id.as_str())
    );
}

#[tokio::test(start_paused = true)]
async fn test_checked_folder_delete_refuses_members() {
    let session = DeviceSession::new(SessionConfig::instant(), MockDeviceSource::new());
    let folder = session.create_folder("F");
    session.move_recordings_to_folder(&strings(&["2"]), Some(folder.id.as_str()));

    let err = session.try_delete_folder(&folder.id).unwrap_err();
    assert_eq!(err, SmartSoundError::FolderNotEmpty(folder.id.clone()));
    assert!(err.is_recoverable());
    assert!(session.folders().iter().any(|f| f.id == folder.id));
}
