use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use time::{Time, UtcOffset};

use crate::estimation::{ColorDefaults, DefaultWaitTable, EstimatorParams};
use crate::slots::{RoomWaitSlot, RoomWaitTable, TimeSlot, TimeSlotIndex};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_UTC_OFFSET_HOURS: i8 = -3;
pub const DEFAULT_CACHE_CAPACITY: usize = 320_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 720;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub facility: Option<FacilitySection>,
    #[serde(default)]
    pub privacy: Option<PrivacySection>,
    #[serde(default)]
    pub cache: Option<CacheSection>,
    #[serde(default)]
    pub estimator: EstimatorParams,
    /// Daily estimation slots, in chronological order.
    pub slots: Vec<SlotEntry>,
    /// Room-wait offsets added on top of queue estimates.
    #[serde(default)]
    pub room_waits: Vec<RoomWaitEntry>,
    /// Static per-slot default waits used when no unit has data.
    pub default_waits: Vec<DefaultWaitEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FacilitySection {
    /// Fixed UTC offset of facility wall clocks, in hours (default: -3)
    pub utc_offset_hours: Option<i8>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PrivacySection {
    /// Salt mixed into pseudonym hashes before storage.
    pub pseudonym_salt: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSection {
    /// Maximum number of cached repository queries (default: 320000)
    pub capacity: Option<usize>,
    /// Seconds a cached query stays fresh (default: 720)
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlotEntry {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoomWaitEntry {
    pub start: String,
    pub end: String,
    pub minutes: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DefaultWaitEntry {
    /// Canonical slot label, `HH:MM-HH:MM`.
    pub slot: String,
    #[serde(flatten)]
    pub waits: ColorDefaults,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

impl Config {
    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Returns the pseudonym salt, or an empty salt if not configured.
    pub fn pseudonym_salt(&self) -> &str {
        self.privacy
            .as_ref()
            .map(|p| p.pseudonym_salt.as_str())
            .unwrap_or("")
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|c| c.capacity)
            .unwrap_or(DEFAULT_CACHE_CAPACITY)
    }

    pub fn cache_ttl(&self) -> Duration {
        let secs = self
            .cache
            .as_ref()
            .and_then(|c| c.ttl_secs)
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);
        Duration::from_secs(secs)
    }

    /// Fixed facility UTC offset (default: -3 hours).
    pub fn local_offset(&self) -> Result<UtcOffset, ConfigError> {
        let hours = self
            .facility
            .as_ref()
            .and_then(|f| f.utc_offset_hours)
            .unwrap_or(DEFAULT_UTC_OFFSET_HOURS);
        UtcOffset::from_hms(hours, 0, 0)
            .map_err(|_| ConfigError::Invalid(format!("utc offset {hours} out of range")))
    }

    pub fn estimator_params(&self) -> EstimatorParams {
        self.estimator.clone()
    }

    /// Slot table parsed and checked for chronological, non-overlapping
    /// intervals.
    pub fn time_slot_index(&self) -> Result<TimeSlotIndex, ConfigError> {
        if self.slots.is_empty() {
            return Err(ConfigError::Invalid("no time slots configured".to_string()));
        }
        let mut slots = Vec::with_capacity(self.slots.len());
        for entry in &self.slots {
            let start = parse_clock(&entry.start)?;
            let end = parse_clock(&entry.end)?;
            if start >= end {
                return Err(ConfigError::Invalid(format!(
                    "slot {}-{} does not end after it starts",
                    entry.start, entry.end
                )));
            }
            slots.push(TimeSlot::new(start, end));
        }
        for pair in slots.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(ConfigError::Invalid(format!(
                    "slots {} and {} overlap or are out of order",
                    pair[0].label, pair[1].label
                )));
            }
        }
        Ok(TimeSlotIndex::new(slots, self.local_offset()?))
    }

    pub fn room_wait_table(&self) -> Result<RoomWaitTable, ConfigError> {
        let mut entries = Vec::with_capacity(self.room_waits.len());
        for entry in &self.room_waits {
            let start = parse_clock(&entry.start)?;
            let end = parse_clock(&entry.end)?;
            if start >= end {
                return Err(ConfigError::Invalid(format!(
                    "room wait interval {}-{} does not end after it starts",
                    entry.start, entry.end
                )));
            }
            entries.push(RoomWaitSlot {
                start,
                end,
                minutes: entry.minutes,
            });
        }
        Ok(RoomWaitTable::new(entries))
    }

    /// Default-wait table, checked to cover every configured slot so the
    /// estimator's last-resort lookup cannot fail at query time.
    pub fn default_wait_table(&self) -> Result<DefaultWaitTable, ConfigError> {
        let mut by_slot = HashMap::new();
        for entry in &self.default_waits {
            by_slot.insert(entry.slot.clone(), entry.waits);
        }
        let table = DefaultWaitTable::new(by_slot);
        let index = self.time_slot_index()?;
        for slot in index.slots() {
            if !table.covers(&slot.label) {
                return Err(ConfigError::Invalid(format!(
                    "no default waits configured for slot {}",
                    slot.label
                )));
            }
        }
        Ok(table)
    }
}

fn parse_clock(raw: &str) -> Result<Time, ConfigError> {
    let invalid = || ConfigError::Invalid(format!("invalid clock time {raw:?}, expected HH:MM"));
    let (hour, minute) = raw.split_once(':').ok_or_else(invalid)?;
    let hour: u8 = hour.parse().map_err(|_| invalid())?;
    let minute: u8 = minute.parse().map_err(|_| invalid())?;
    Time::from_hms(hour, minute, 0).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_config(tag: &str, contents: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("espera-config-{tag}-{unique}.toml"));
        fs::write(&path, contents).expect("write temp config");
        path
    }

    const MINIMAL: &str = r#"
[app]
name = "espera"

[logging]
level = "info"

[[slots]]
start = "05:00"
end = "08:00"

[[slots]]
start = "08:00"
end = "11:30"

[[default_waits]]
slot = "05:00-08:00"
blue = 80.0
green = 65.0
yellow = 50.0
orange = 35.0
red = 2.0

[[default_waits]]
slot = "08:00-11:30"
blue = 100.0
green = 85.0
yellow = 70.0
orange = 55.0
red = 2.0
"#;

    #[test]
    fn default_config_builds_every_table() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_default()?;
        let index = config.time_slot_index()?;
        assert!(!index.slots().is_empty());
        config.room_wait_table()?;
        config.default_wait_table()?;
        Ok(())
    }

    #[test]
    fn minimal_config_falls_back_to_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let path = temp_config("minimal", MINIMAL);
        let config = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert_eq!(config.server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(config.pseudonym_salt(), "");
        assert_eq!(config.cache_capacity(), DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.cache_ttl(), Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        assert_eq!(config.local_offset()?, UtcOffset::from_hms(-3, 0, 0)?);

        let params = config.estimator_params();
        assert_eq!(params.min_wait_minutes, 5.0);
        assert_eq!(params.max_wait_minutes, 360.0);
        assert_eq!(params.smoothing_window_minutes, 75.0);

        assert!(config.room_wait_table()?.offset_at(Time::from_hms(9, 0, 0)?) == 0.0);
        Ok(())
    }

    #[test]
    fn partial_estimator_section_keeps_other_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!("{MINIMAL}\n[estimator]\ndecay_rate = 0.9\n");
        let path = temp_config("partial-estimator", &contents);
        let config = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        let params = config.estimator_params();
        assert_eq!(params.decay_rate, 0.9);
        assert_eq!(params.concept3_min_samples, 5);
        assert_eq!(params.iqr_factor, 2.0);
        Ok(())
    }

    #[test]
    fn slot_labels_are_normalized_from_clock_times() -> Result<(), Box<dyn std::error::Error>> {
        let path = temp_config("labels", MINIMAL);
        let config = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        let index = config.time_slot_index()?;
        let labels: Vec<&str> = index.slots().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["05:00-08:00", "08:00-11:30"]);
        Ok(())
    }

    #[test]
    fn overlapping_slots_are_rejected() {
        let contents = r#"
[app]
name = "espera"

[logging]
level = "info"

[[slots]]
start = "05:00"
end = "08:30"

[[slots]]
start = "08:00"
end = "11:30"

[[default_waits]]
slot = "05:00-08:30"
blue = 80.0
green = 65.0
yellow = 50.0
orange = 35.0
red = 2.0

[[default_waits]]
slot = "08:00-11:30"
blue = 100.0
green = 85.0
yellow = 70.0
orange = 55.0
red = 2.0
"#;
        let path = temp_config("overlap", contents);
        let config = load_from_path(&path).expect("parses");
        let _ = fs::remove_file(&path);
        assert!(matches!(config.time_slot_index(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn reversed_slot_bounds_are_rejected() {
        let contents = r#"
[app]
name = "espera"

[logging]
level = "info"

[[slots]]
start = "08:00"
end = "05:00"

[[default_waits]]
slot = "08:00-05:00"
blue = 80.0
green = 65.0
yellow = 50.0
orange = 35.0
red = 2.0
"#;
        let path = temp_config("reversed", contents);
        let config = load_from_path(&path).expect("parses");
        let _ = fs::remove_file(&path);
        assert!(matches!(config.time_slot_index(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn uncovered_slot_fails_default_wait_validation() {
        let contents = r#"
[app]
name = "espera"

[logging]
level = "info"

[[slots]]
start = "05:00"
end = "08:00"

[[slots]]
start = "08:00"
end = "11:30"

[[default_waits]]
slot = "05:00-08:00"
blue = 80.0
green = 65.0
yellow = 50.0
orange = 35.0
red = 2.0
"#;
        let path = temp_config("uncovered", contents);
        let config = load_from_path(&path).expect("parses");
        let _ = fs::remove_file(&path);
        assert!(matches!(config.default_wait_table(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_clock_times_are_rejected() {
        let contents = r#"
[app]
name = "espera"

[logging]
level = "info"

[[slots]]
start = "5 am"
end = "08:00"

[[default_waits]]
slot = "05:00-08:00"
blue = 80.0
green = 65.0
yellow = 50.0
orange = 35.0
red = 2.0
"#;
        let path = temp_config("clock", contents);
        let config = load_from_path(&path).expect("parses");
        let _ = fs::remove_file(&path);
        assert!(matches!(config.time_slot_index(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_config_file_returns_read_error() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("espera-config-missing-{unique}.toml"));

        let result = load_from_path(&path);

        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn invalid_toml_returns_parse_error() {
        let path = temp_config("invalid", "not = [valid");
        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
