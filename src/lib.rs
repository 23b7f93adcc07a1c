pub mod config;
pub mod device;
pub mod library;
pub mod preferences;
pub mod utils;

pub use config::SessionConfig;
pub use device::{
    ConnectionRecord, ConnectionStatus, DeviceSession, DeviceSource, Folder, MockDeviceSource,
    Recording, SessionEvent, SessionSnapshot,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmartSoundError {
    #[error("A device scan is already in progress")]
    ScanInProgress,

    #[error("Folder is not empty: {0}")]
    FolderNotEmpty(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Async runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for SmartSoundError {
    fn from(e: std::io::Error) -> Self {
        SmartSoundError::IOError(e.to_string())
    }
}

impl SmartSoundError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The running scan will finish on its own
            SmartSoundError::ScanInProgress => true,
            // The user can empty the folder and retry
            SmartSoundError::FolderNotEmpty(_) => true,
            SmartSoundError::FolderNotFound(_) => true,
            // Requires the host to provide a runtime
            SmartSoundError::RuntimeUnavailable(_) => false,
            SmartSoundError::ConfigError(_) => false,
            SmartSoundError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            SmartSoundError::ScanInProgress => {
                "Already searching for your device. Please wait.".to_string()
            }
            SmartSoundError::FolderNotEmpty(_) => {
                "This folder still contains recordings. Move or delete them first.".to_string()
            }
            SmartSoundError::FolderNotFound(_) => "That folder no longer exists.".to_string(),
            SmartSoundError::RuntimeUnavailable(_) => {
                "Internal timer error. Please restart the application.".to_string()
            }
            SmartSoundError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            SmartSoundError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SmartSoundError>;
