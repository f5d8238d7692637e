// ==========================================
// Day Treatment Planner - Staff member
// ==========================================
// Rostering (work days, week plans) is external; the engine only reads it.
// ==========================================

use chrono::Weekday;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub name: String,                   // unique key
    pub max_patients: u32,              // patient headcount ceiling
    #[serde(default)]
    pub max_work_minutes: Option<u32>,  // total work ceiling for the day
    #[serde(default)]
    pub work_days: Vec<Weekday>,        // empty = every day
}

impl StaffMember {
    pub fn new(name: &str, max_patients: u32) -> Self {
        Self {
            name: name.to_string(),
            max_patients,
            max_work_minutes: None,
            work_days: Vec::new(),
        }
    }

    pub fn works_on(&self, weekday: Weekday) -> bool {
        self.work_days.is_empty() || self.work_days.contains(&weekday)
    }
}
