// ==========================================
// Day Treatment Planner - Time slot view
// ==========================================
// Derived only, never stored. Produced by analytics for dashboards.
// ==========================================

use crate::domain::types::ClockTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub slot: ClockTime,
    pub count: usize,
    pub occupant_ids: Vec<String>,
    pub occupant_names: Vec<String>,
    pub within_capacity: bool,
    pub in_break: bool,
}

impl TimeSlot {
    pub fn excess(&self, max: usize) -> usize {
        self.count.saturating_sub(max)
    }
}
