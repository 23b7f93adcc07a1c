//! Configuration for the device session
//!
//! Holds the simulated handshake/transfer delays, tick periods and initial
//! hardware settings. Loadable from TOML; every field falls back to its
//! default when omitted.

use crate::{Result, SmartSoundError};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Accepted range for the hardware button press threshold
pub const BUTTON_PRESS_RANGE_SECS: std::ops::RangeInclusive<u32> = 10..=300;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Time spent in SCANNING before moving to CONNECTING
    pub scan_delay_ms: u64,

    /// Time spent in CONNECTING before reaching CONNECTED
    pub connect_delay_ms: u64,

    /// Simulated transfer time of a single file sync
    pub sync_delay_ms: u64,

    /// Period of the elapsed-recording counter
    pub recording_tick_ms: u64,

    /// Period of the battery drain while connected
    pub battery_tick_ms: u64,

    /// Battery percentage at startup
    pub initial_battery: u8,

    /// Music volume at startup (0-100)
    pub initial_volume: u8,

    /// Hardware button press threshold in seconds
    pub button_press_duration_secs: u32,

    /// Events queued per subscriber before new ones are dropped
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_delay_ms: 2000,
            connect_delay_ms: 1500,
            sync_delay_ms: 800,
            recording_tick_ms: 1000,
            battery_tick_ms: 60_000,
            initial_battery: 85,
            initial_volume: 50,
            button_press_duration_secs: 30,
            event_buffer: 256,
        }
    }
}

impl SessionConfig {
    /// Zero handshake and transfer delays; tick periods keep their defaults
    pub fn instant() -> Self {
        Self::default().with_delays(0, 0, 0)
    }

    pub fn with_delays(mut self, scan_ms: u64, connect_ms: u64, sync_ms: u64) -> Self {
        self.scan_delay_ms = scan_ms;
        self.connect_delay_ms = connect_ms;
        self.sync_delay_ms = sync_ms;
        self
    }

    pub fn with_tick_periods(mut self, recording_ms: u64, battery_ms: u64) -> Self {
        self.recording_tick_ms = recording_ms;
        self.battery_tick_ms = battery_ms;
        self
    }

    pub fn with_initial_battery(mut self, level: u8) -> Self {
        self.initial_battery = level;
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    pub fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn sync_delay(&self) -> Duration {
        Duration::from_millis(self.sync_delay_ms)
    }

    pub fn recording_tick(&self) -> Duration {
        Duration::from_millis(self.recording_tick_ms)
    }

    pub fn battery_tick(&self) -> Duration {
        Duration::from_millis(self.battery_tick_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.recording_tick_ms == 0 {
            return Err(SmartSoundError::ConfigError(
                "recording_tick_ms must be greater than zero".to_string(),
            ));
        }
        if self.battery_tick_ms == 0 {
            return Err(SmartSoundError::ConfigError(
                "battery_tick_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(SmartSoundError::ConfigError(
                "event_buffer must be greater than zero".to_string(),
            ));
        }
        if self.initial_battery > 100 {
            return Err(SmartSoundError::ConfigError(format!(
                "initial_battery out of range: {}",
                self.initial_battery
            )));
        }
        if self.initial_volume > 100 {
            return Err(SmartSoundError::ConfigError(format!(
                "initial_volume out of range: {}",
                self.initial_volume
            )));
        }
        if !BUTTON_PRESS_RANGE_SECS.contains(&self.button_press_duration_secs) {
            return Err(SmartSoundError::ConfigError(format!(
                "button_press_duration_secs must be within {}..={}: {}",
                BUTTON_PRESS_RANGE_SECS.start(),
                BUTTON_PRESS_RANGE_SECS.end(),
                self.button_press_duration_secs
            )));
        }
        Ok(())
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SessionConfig = toml::from_str(content)
            .map_err(|e| SmartSoundError::ConfigError(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SmartSoundError::IOError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}
