//! Data provider for the device session
//!
//! The session asks its source for the seed library and for the file listing
//! revealed once a connection completes. A real transport would sit behind
//! the same trait.

use super::types::{now_millis, ConnectionRecord, Folder, Recording};

const DAY_MS: i64 = 86_400_000;

/// Supplies seed state and device listings to a `DeviceSession`
pub trait DeviceSource: Send + Sync {
    /// Name reported by the device once paired
    fn device_name(&self) -> String;

    /// Files stored on the device, fetched on every successful connection
    fn fetch_device_files(&self) -> Vec<Recording>;

    /// Recordings already in the local library at startup
    fn initial_library(&self) -> Vec<Recording> {
        Vec::new()
    }

    /// Folders already in the local library at startup
    fn initial_folders(&self) -> Vec<Folder> {
        Vec::new()
    }

    /// Previous pairings, newest first
    fn initial_history(&self) -> Vec<ConnectionRecord> {
        Vec::new()
    }
}

/// Fixed-content source used in place of real hardware
#[derive(Debug, Clone)]
pub struct MockDeviceSource {
    device_name: String,
}

impl MockDeviceSource {
    pub const DEFAULT_DEVICE_NAME: &'static str = "SmartSound X1";
    const FILE_SOURCE: &'static str = "SmartSpeaker X1";

    pub fn new() -> Self {
        Self {
            device_name: Self::DEFAULT_DEVICE_NAME.to_string(),
        }
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }
}

impl Default for MockDeviceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSource for MockDeviceSource {
    fn device_name(&self) -> String {
        self.device_name.clone()
    }

    fn fetch_device_files(&self) -> Vec<Recording> {
        vec![
            Recording::new(
                "1",
                "Meeting_2023_10_27.wav",
                345,
                1_698_400_000_000,
                4_500_000,
                Self::FILE_SOURCE,
            )
            .with_version("1.0.2"),
            Recording::new(
                "2",
                "Idea_Sketch.wav",
                42,
                1_698_480_000_000,
                500_000,
                Self::FILE_SOURCE,
            )
            .with_version("1.0.0"),
            Recording::new(
                "3",
                "Nature_Sounds.wav",
                1200,
                1_698_500_000_000,
                15_000_000,
                Self::FILE_SOURCE,
            )
            .with_version("2.1.0"),
            Recording::new(
                "4",
                "Conference_Call.wav",
                1800,
                1_698_600_000_000,
                22_000_000,
                Self::FILE_SOURCE,
            )
            .with_version("1.0.0"),
        ]
    }

    fn initial_library(&self) -> Vec<Recording> {
        vec![
            Recording::new(
                "1",
                "Meeting_2023_10_27.wav",
                345,
                1_698_400_000_000,
                4_500_000,
                Self::FILE_SOURCE,
            )
            .favorite()
            .with_tags(["Work", "Meeting"])
            .with_thumbnail("https://picsum.photos/seed/rec1/200/200")
            .with_version("1.0.2"),
            Recording::new(
                "2",
                "Idea_Sketch.wav",
                42,
                1_698_480_000_000,
                500_000,
                Self::FILE_SOURCE,
            )
            .with_tags(["Creative"])
            .with_thumbnail("https://picsum.photos/seed/rec2/200/200")
            .with_version("1.0.0"),
            Recording::new(
                "3",
                "Nature_Ambience.wav",
                1200,
                1_698_500_000_000,
                15_000_000,
                Self::FILE_SOURCE,
            )
            .with_tags(["Travel"])
            .with_thumbnail("https://picsum.photos/seed/rec3/200/200")
            .with_version("2.1.0"),
        ]
    }

    fn initial_folders(&self) -> Vec<Folder> {
        vec![Folder {
            id: "f1".to_string(),
            name: "Work".to_string(),
            timestamp: 1_698_300_000_000,
        }]
    }

    fn initial_history(&self) -> Vec<ConnectionRecord> {
        let now = now_millis();
        vec![
            ConnectionRecord {
                id: "h1".to_string(),
                device_name: self.device_name.clone(),
                timestamp: now - DAY_MS * 2,
                duration_minutes: Some(45),
            },
            ConnectionRecord {
                id: "h2".to_string(),
                device_name: self.device_name.clone(),
                timestamp: now - DAY_MS * 5,
                duration_minutes: Some(120),
            },
        ]
    }
}
