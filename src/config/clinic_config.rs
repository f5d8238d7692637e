// ==========================================
// Day Treatment Planner - Clinic configuration
// ==========================================
// Every fixed constant the engine reads: operating hours, slot width,
// setup capacity, break windows, closing buffer, coordinator cap,
// optimizer iteration cap.
// ==========================================
// Sources (later wins): defaults -> JSON document -> key/value overrides
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::types::{ClockTime, TimeWindow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

// ==========================================
// ClinicConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    // ===== Operating hours =====
    pub day_start: ClockTime,
    pub day_end: ClockTime,
    pub slot_minutes: u32,

    // ===== Setup capacity =====
    pub max_concurrent_setups: usize,
    pub morning_break: TimeWindow,
    pub lunch_break: TimeWindow,
    pub closing_buffer_minutes: u32,

    // ===== Staff =====
    pub coordinator_max_patients: u32,

    // ===== Optimizer =====
    pub max_optimizer_iterations: usize,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            day_start: hm(8, 0),
            day_end: hm(17, 0),
            slot_minutes: 30,
            max_concurrent_setups: 3,
            morning_break: TimeWindow::new(hm(10, 0), hm(10, 30)),
            lunch_break: TimeWindow::new(hm(12, 0), hm(13, 0)),
            closing_buffer_minutes: 60,
            coordinator_max_patients: 2,
            max_optimizer_iterations: 200,
        }
    }
}

fn hm(hour: u16, minute: u16) -> ClockTime {
    ClockTime::from_minutes(u32::from(hour) * 60 + u32::from(minute))
}

impl ClinicConfig {
    // ==========================================
    // Loading
    // ==========================================

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: ClinicConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Defaults with key/value overrides applied (see `config_keys`).
    pub fn from_overrides(overrides: &HashMap<String, String>) -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(overrides)?;
        Ok(config)
    }

    /// Apply key/value overrides in place, then validate.
    ///
    /// Unknown keys are ignored so a shared key/value store can hold
    /// settings for other components.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        let mut keys: Vec<&String> = overrides.keys().collect();
        keys.sort();

        for key in keys {
            let value = &overrides[key];
            match key.as_str() {
                config_keys::DAY_START => self.day_start = parse_value(key, value)?,
                config_keys::DAY_END => self.day_end = parse_value(key, value)?,
                config_keys::SLOT_MINUTES => self.slot_minutes = parse_value(key, value)?,
                config_keys::MAX_CONCURRENT_SETUPS => {
                    self.max_concurrent_setups = parse_value(key, value)?
                }
                config_keys::MORNING_BREAK => self.morning_break = parse_window(key, value)?,
                config_keys::LUNCH_BREAK => self.lunch_break = parse_window(key, value)?,
                config_keys::CLOSING_BUFFER_MINUTES => {
                    self.closing_buffer_minutes = parse_value(key, value)?
                }
                config_keys::COORDINATOR_MAX_PATIENTS => {
                    self.coordinator_max_patients = parse_value(key, value)?
                }
                config_keys::MAX_OPTIMIZER_ITERATIONS => {
                    self.max_optimizer_iterations = parse_value(key, value)?
                }
                other => tracing::debug!(key = other, "ignoring unknown config key"),
            }
        }

        self.validate()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.slot_minutes == 0 {
            return Err(ConfigError::Invalid("slot_minutes must be positive".into()));
        }
        if self.day_end <= self.day_start {
            return Err(ConfigError::Invalid(format!(
                "day_end {} must be after day_start {}",
                self.day_end, self.day_start
            )));
        }
        if self.max_concurrent_setups == 0 {
            return Err(ConfigError::Invalid("max_concurrent_setups must be positive".into()));
        }
        for (label, window) in [("morning_break", &self.morning_break), ("lunch_break", &self.lunch_break)] {
            if window.end <= window.start {
                return Err(ConfigError::Invalid(format!("{} {} is empty", label, window)));
            }
        }
        if self.closing_buffer_minutes >= self.operating_minutes() {
            return Err(ConfigError::Invalid(format!(
                "closing_buffer_minutes {} leaves no bookable time",
                self.closing_buffer_minutes
            )));
        }
        if self.max_optimizer_iterations == 0 {
            return Err(ConfigError::Invalid("max_optimizer_iterations must be positive".into()));
        }
        Ok(())
    }

    // ==========================================
    // Derived values
    // ==========================================

    pub fn operating_minutes(&self) -> u32 {
        self.day_end.minutes().saturating_sub(self.day_start.minutes())
    }

    /// Slot labels from day_start (inclusive) to day_end (exclusive)
    pub fn slot_grid(&self) -> Vec<ClockTime> {
        let step = self.slot_minutes.max(1) as usize;
        (self.day_start.minutes()..self.day_end.minutes())
            .step_by(step)
            .map(ClockTime::from_minutes)
            .collect()
    }

    pub fn slot_of(&self, t: ClockTime) -> ClockTime {
        let offset = t.minutes().saturating_sub(self.day_start.minutes());
        let aligned = offset / self.slot_minutes.max(1) * self.slot_minutes.max(1);
        if t < self.day_start {
            t.floor_to_grid(self.slot_minutes)
        } else {
            self.day_start.add_minutes(aligned)
        }
    }

    pub fn is_in_break(&self, t: ClockTime) -> bool {
        self.morning_break.contains(t) || self.lunch_break.contains(t)
    }

    /// Latest slot that still leaves the closing buffer before day_end
    pub fn latest_setup_slot(&self) -> ClockTime {
        ClockTime::from_minutes(
            self.day_end
                .minutes()
                .saturating_sub(self.closing_buffer_minutes),
        )
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// Windows are written `HH:MM-HH:MM`
fn parse_window(key: &str, value: &str) -> ConfigResult<TimeWindow> {
    let (start, end) = value.split_once('-').ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: "expected HH:MM-HH:MM".to_string(),
    })?;
    Ok(TimeWindow::new(parse_value(key, start)?, parse_value(key, end)?))
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    // Operating hours
    pub const DAY_START: &str = "day_start";
    pub const DAY_END: &str = "day_end";
    pub const SLOT_MINUTES: &str = "slot_minutes";

    // Setup capacity
    pub const MAX_CONCURRENT_SETUPS: &str = "max_concurrent_setups";
    pub const MORNING_BREAK: &str = "morning_break"; // HH:MM-HH:MM
    pub const LUNCH_BREAK: &str = "lunch_break";     // HH:MM-HH:MM
    pub const CLOSING_BUFFER_MINUTES: &str = "closing_buffer_minutes";

    // Staff
    pub const COORDINATOR_MAX_PATIENTS: &str = "coordinator_max_patients";

    // Optimizer
    pub const MAX_OPTIMIZER_ITERATIONS: &str = "max_optimizer_iterations";
}
