// ==========================================
// Day Treatment Planner - Workload analytics
// ==========================================
// Read-only dashboard diagnostics. Shares no state with the optimizer.
// Counts active patients by setup slot over the operating grid:
// the materialized setup start, else the patient start.
// ==========================================

use crate::config::ClinicConfig;
use crate::domain::patient::Patient;
use crate::domain::slot::TimeSlot;
use crate::domain::types::ClockTime;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct WorkloadAnalytics {
    config: ClinicConfig,
}

impl WorkloadAnalytics {
    pub fn new(config: ClinicConfig) -> Self {
        Self { config }
    }

    /// One entry per grid slot, empty slots included.
    pub fn occupancy_by_time_slot(&self, patients: &[Patient]) -> Vec<TimeSlot> {
        let mut by_slot: BTreeMap<ClockTime, Vec<&Patient>> = BTreeMap::new();
        for patient in patients.iter().filter(|p| p.is_active()) {
            by_slot
                .entry(self.config.slot_of(patient.setup_start()))
                .or_default()
                .push(patient);
        }

        let max = self.config.max_concurrent_setups;
        self.config
            .slot_grid()
            .into_iter()
            .map(|slot| {
                let mut occupants = by_slot.remove(&slot).unwrap_or_default();
                occupants.sort_by(|a, b| a.setup_start().cmp(&b.setup_start()).then(a.id.cmp(&b.id)));
                TimeSlot {
                    slot,
                    count: occupants.len(),
                    occupant_ids: occupants.iter().map(|p| p.id.clone()).collect(),
                    occupant_names: occupants.iter().map(|p| p.name.clone()).collect(),
                    within_capacity: occupants.len() <= max,
                    in_break: self.config.is_in_break(slot),
                }
            })
            .collect()
    }

    /// Human-readable warnings derived from the slot view.
    pub fn warnings(&self, patients: &[Patient]) -> Vec<String> {
        let max = self.config.max_concurrent_setups;
        let mut warnings = Vec::new();

        for slot in self.occupancy_by_time_slot(patients) {
            if !slot.within_capacity {
                warnings.push(format!(
                    "{}: {} patients exceed the maximum of {} concurrent setups ({})",
                    slot.slot,
                    slot.count,
                    max,
                    slot.occupant_names.join(", ")
                ));
            }
            if slot.in_break && slot.count > 0 {
                warnings.push(format!(
                    "{}: {} setup(s) during a break ({})",
                    slot.slot,
                    slot.count,
                    slot.occupant_names.join(", ")
                ));
            }
        }

        let mut outside: Vec<&Patient> = patients
            .iter()
            .filter(|p| p.is_active())
            .filter(|p| p.start_time < self.config.day_start || p.start_time >= self.config.day_end)
            .collect();
        outside.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        for patient in outside {
            warnings.push(format!(
                "{} starts at {}, outside operating hours {}-{}",
                patient.name, patient.start_time, self.config.day_start, self.config.day_end
            ));
        }

        debug!(count = warnings.len(), "workload warnings derived");
        warnings
    }

    /// Busiest slot; earliest wins ties
    pub fn peak_slot(&self, patients: &[Patient]) -> Option<TimeSlot> {
        self.occupancy_by_time_slot(patients)
            .into_iter()
            .filter(|s| s.count > 0)
            .fold(None, |best: Option<TimeSlot>, slot| match best {
                Some(b) if b.count >= slot.count => Some(b),
                _ => Some(slot),
            })
    }
}
