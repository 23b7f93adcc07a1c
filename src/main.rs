use anyhow::{Context, Result};
use smartsound::library::{LibraryQuery, SortOption, StorageSummary};
use smartsound::preferences::{t, Language};
use smartsound::utils::{format_duration, format_size};
use smartsound::{DeviceSession, MockDeviceSource, SessionConfig, SessionEvent};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_ENV: &str = "SMARTSOUND_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smartsound=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => SessionConfig::load(&path)
            .with_context(|| format!("loading session config from {path}"))?,
        Err(_) => SessionConfig::default(),
    };

    info!("Starting SmartSound companion session");
    let language = Language::EnUs;
    let session = DeviceSession::try_new(config, MockDeviceSource::new())
        .context("invalid session config")?;
    let events = session.subscribe();

    session.scan_for_devices().await?;
    info!(
        status = t("status.connected", language),
        device = ?session.device_name(),
        battery = session.battery_level(),
        "Paired"
    );

    session.toggle_recording()?;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    session.toggle_recording()?;

    let synced = session.sync_all().await;
    info!(synced, "Device files copied to library");

    let notes = session.create_folder("Notes");
    let newest = session.device_files().first().map(|f| f.id.clone());
    if let Some(id) = newest {
        session.move_recordings_to_folder(&[id.clone()], Some(notes.id.as_str()));
        session.toggle_pin_recording(&id);
    }

    let snapshot = session.snapshot();
    let view = snapshot.library_view(&LibraryQuery::root().sorted_by(SortOption::Size));
    for rec in &view.recordings {
        info!(
            pinned = rec.is_pinned,
            duration = %format_duration(rec.duration_sec),
            size = %format_size(rec.size_bytes),
            "{}",
            rec.filename
        );
    }
    for folder in &view.folders {
        info!(
            items = session.folder_item_count(&folder.id),
            "Folder {}", folder.name
        );
    }

    let summary = StorageSummary::of(&snapshot.local_recordings);
    info!(
        count = summary.count,
        total = %format_size(summary.total_bytes),
        "{}",
        t("device.storage", language)
    );

    session.disconnect();

    let changes = events
        .try_iter()
        .filter(|e| !matches!(e, SessionEvent::RecordingTick(_)))
        .count();
    info!(changes, "Session finished");
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);

    Ok(())
}
