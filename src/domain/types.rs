// ==========================================
// Day Treatment Planner - Domain value types
// ==========================================
// Time of day, time windows and action kinds.
// Wire format: 24-hour HH:MM, zero-padded.
// ==========================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

// ==========================================
// ClockTime - time of day
// ==========================================
// Stored as minutes since midnight. Arithmetic saturates inside the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Build from hour/minute, `None` when out of range.
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    /// Build from minutes since midnight, clamped to the last minute of the day.
    pub fn from_minutes(minutes: u32) -> Self {
        let max = u32::from(MINUTES_PER_DAY - 1);
        Self(minutes.min(max) as u16)
    }

    pub fn minutes(&self) -> u32 {
        u32::from(self.0)
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }

    pub fn add_minutes(&self, minutes: u32) -> Self {
        Self::from_minutes(self.minutes().saturating_add(minutes))
    }

    /// Shift by a signed offset; never goes below midnight.
    pub fn offset_by(&self, minutes: i32) -> Self {
        let shifted = i64::from(self.minutes()) + i64::from(minutes);
        Self::from_minutes(shifted.max(0) as u32)
    }

    /// Signed difference `self - other` in minutes.
    pub fn minutes_since(&self, other: ClockTime) -> i32 {
        i32::from(self.0) - i32::from(other.0)
    }

    /// Round down to the start of the enclosing grid cell.
    pub fn floor_to_grid(&self, width_minutes: u32) -> Self {
        if width_minutes == 0 {
            return *self;
        }
        Self::from_minutes(self.minutes() / width_minutes * width_minutes)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Parse error for `HH:MM` labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseClockTimeError(pub String);

impl fmt::Display for ParseClockTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time '{}', expected HH:MM", self.0)
    }
}

impl std::error::Error for ParseClockTimeError {}

impl FromStr for ClockTime {
    type Err = ParseClockTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || ParseClockTimeError(raw.to_string());

        let (h, m) = raw.split_once(':').ok_or_else(err)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(err());
        }
        let hour: u16 = h.parse().map_err(|_| err())?;
        let minute: u16 = m.parse().map_err(|_| err())?;
        ClockTime::from_hm(hour, minute).ok_or_else(err)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==========================================
// TimeWindow - half-open [start, end)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeWindow {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: ClockTime) -> bool {
        self.start <= t && t < self.end
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// ==========================================
// ActionKind - clinical action kinds
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Setup,               // prepare and start the infusion
    Infusion,            // time-extended treatment
    Check,               // offset-timed check during infusion
    ProtocolCheck,       // sequential protocol verification
    Observation,         // post-infusion observation
    Removal,             // disconnect
    ProtocolSwitchCheck, // offset-timed check at a protocol switch
}

impl ActionKind {
    /// Kinds whose start is `infusion start + check offset`
    pub fn uses_check_offset(&self) -> bool {
        matches!(self, ActionKind::Check | ActionKind::ProtocolSwitchCheck)
    }

    /// Infusion and observation run without a dedicated staff member
    pub fn requires_staff(&self) -> bool {
        !matches!(self, ActionKind::Infusion | ActionKind::Observation)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Setup => "setup",
            ActionKind::Infusion => "infusion",
            ActionKind::Check => "check",
            ActionKind::ProtocolCheck => "protocol-check",
            ActionKind::Observation => "observation",
            ActionKind::Removal => "removal",
            ActionKind::ProtocolSwitchCheck => "protocol-switch-check",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "setup" => Ok(ActionKind::Setup),
            "infusion" => Ok(ActionKind::Infusion),
            "check" => Ok(ActionKind::Check),
            "protocol-check" => Ok(ActionKind::ProtocolCheck),
            "observation" => Ok(ActionKind::Observation),
            "removal" => Ok(ActionKind::Removal),
            "protocol-switch-check" => Ok(ActionKind::ProtocolSwitchCheck),
            other => Err(format!("unknown action kind: {}", other)),
        }
    }
}
