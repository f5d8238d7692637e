// ==========================================
// Day Treatment Planner - Patient and Action
// ==========================================
// A patient owns exactly one action timeline at a time.
// Start time and actions are rewritten together, never separately.
// ==========================================

use crate::domain::types::{ActionKind, ClockTime};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Action - one clinical step of a patient's day
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    pub kind: ActionKind,

    // ===== Materialized values =====
    #[serde(default)]
    pub actual_duration_minutes: Option<u32>, // overrides the planned duration
    #[serde(default)]
    pub assigned_staff: Option<String>,
    #[serde(default)]
    pub check_offset_minutes: Option<i32>, // relative to the owning infusion start
    #[serde(default)]
    pub start_time: Option<ClockTime>,

    pub patient_id: String,
}

impl Action {
    /// Duration used for timing and workload
    pub fn effective_duration(&self) -> u32 {
        self.actual_duration_minutes.unwrap_or(self.duration_minutes)
    }

    pub fn end_time(&self) -> Option<ClockTime> {
        self.start_time.map(|s| s.add_minutes(self.effective_duration()))
    }
}

// ==========================================
// Patient
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub start_time: ClockTime,
    pub scheduled_date: NaiveDate,
    pub medication_id: String,
    pub treatment_number: u32,

    // ===== Day status flags =====
    #[serde(default)]
    pub no_show: bool,
    #[serde(default)]
    pub late_cancellation: bool,
    #[serde(default)]
    pub medication_discarded: bool,

    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Patient {
    /// No-show and late-cancelled patients hold no chair or setup capacity.
    pub fn is_active(&self) -> bool {
        !self.no_show && !self.late_cancellation
    }

    pub fn is_scheduled_on(&self, date: NaiveDate) -> bool {
        self.scheduled_date == date
    }

    /// Replace start time and the whole timeline in one step.
    ///
    /// Every incoming action is re-owned by this patient; the previous
    /// actions are returned to the caller.
    pub fn replace_timeline(&mut self, start_time: ClockTime, mut actions: Vec<Action>) -> Vec<Action> {
        for action in actions.iter_mut() {
            action.patient_id = self.id.clone();
        }
        self.start_time = start_time;
        std::mem::replace(&mut self.actions, actions)
    }

    pub fn setup_action(&self) -> Option<&Action> {
        self.actions.iter().find(|a| a.kind == ActionKind::Setup)
    }

    /// Planned start of the setup; the patient start when none is materialized
    pub fn setup_start(&self) -> ClockTime {
        self.setup_action()
            .and_then(|a| a.start_time)
            .unwrap_or(self.start_time)
    }
}
