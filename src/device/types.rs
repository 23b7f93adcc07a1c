use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Current wall-clock time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a time-ordered unique identifier
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Pairing lifecycle of the companion device
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Scanning,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Scanning or connecting
    pub fn is_busy(&self) -> bool {
        matches!(self, ConnectionStatus::Scanning | ConnectionStatus::Connecting)
    }

    /// `Error` is presented the same way as `Disconnected`; both permit a fresh scan
    pub fn can_scan(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Disconnected | ConnectionStatus::Error
        )
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "DISCONNECTED"),
            ConnectionStatus::Scanning => write!(f, "SCANNING"),
            ConnectionStatus::Connecting => write!(f, "CONNECTING"),
            ConnectionStatus::Connected => write!(f, "CONNECTED"),
            ConnectionStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// A unit of audio content, either on the device or in the local library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub filename: String,
    pub duration_sec: u32,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub size_bytes: u64,
    /// Name of the device that produced the recording
    pub source: String,
    pub is_favorite: bool,
    pub is_pinned: bool,
    pub tags: BTreeSet<String>,
    pub thumbnail_url: Option<String>,
    pub version: Option<String>,
    /// `None` means the library root
    pub folder_id: Option<String>,
}

impl Recording {
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        duration_sec: u32,
        timestamp: i64,
        size_bytes: u64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            duration_sec,
            timestamp,
            size_bytes,
            source: source.into(),
            is_favorite: false,
            is_pinned: false,
            tags: BTreeSet::new(),
            thumbnail_url: None,
            version: None,
            folder_id: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn favorite(mut self) -> Self {
        self.is_favorite = true;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.is_pinned = true;
        self
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    pub fn is_in_root(&self) -> bool {
        self.folder_id.is_none()
    }

    pub fn is_in_folder(&self, folder_id: &str) -> bool {
        self.folder_id.as_deref() == Some(folder_id)
    }
}

/// A flat, non-nesting grouping of local recordings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub timestamp: i64,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            timestamp: now_millis(),
        }
    }
}

/// One entry of the pairing history log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: String,
    pub device_name: String,
    pub timestamp: i64,
    pub duration_minutes: Option<u32>,
}

impl ConnectionRecord {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            device_name: device_name.into(),
            timestamp: now_millis(),
            duration_minutes: None,
        }
    }
}
