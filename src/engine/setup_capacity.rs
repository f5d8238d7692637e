// ==========================================
// Day Treatment Planner - Setup Capacity Tracker
// ==========================================
// State: slot label -> setups recorded in that slot (per run)
// Red line: a slot never holds more than max_concurrent_setups
// ==========================================
// The tracker records, it does not refuse: callers check
// can_add_setup before add_setup.
// ==========================================

use crate::config::ClinicConfig;
use crate::domain::types::ClockTime;
use std::collections::BTreeMap;

// ==========================================
// Trait: SetupCapacity
// ==========================================
pub trait SetupCapacity {
    /// occupancy(slot) < max
    fn can_add_setup(&self, slot: ClockTime) -> bool;

    fn setups_at(&self, slot: ClockTime) -> usize;

    /// Setups beyond the maximum in this slot
    fn excess_at(&self, slot: ClockTime) -> usize;
}

#[derive(Debug, Clone)]
pub struct SetupCapacityTracker {
    config: ClinicConfig,
    occupancy: BTreeMap<ClockTime, usize>,
}

impl SetupCapacityTracker {
    pub fn new(config: &ClinicConfig) -> Self {
        Self {
            config: config.clone(),
            occupancy: BTreeMap::new(),
        }
    }

    pub fn max_concurrent_setups(&self) -> usize {
        self.config.max_concurrent_setups
    }

    pub fn add_setup(&mut self, slot: ClockTime) {
        *self.occupancy.entry(slot).or_insert(0) += 1;
    }

    /// Undo one add_setup; returns false when the slot was empty.
    pub fn remove_setup(&mut self, slot: ClockTime) -> bool {
        match self.occupancy.get_mut(&slot) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.occupancy.remove(&slot);
                true
            }
            None => false,
        }
    }

    /// First slot at or after `from` that can take another setup.
    ///
    /// Walks in slot-width steps, skips both break windows and gives up
    /// once a slot would leave less than the closing buffer.
    pub fn find_next_available_slot(&self, from: ClockTime) -> Option<ClockTime> {
        let step = self.config.slot_minutes.max(1);
        let latest = self.config.latest_setup_slot();
        let mut slot = from.max(self.config.day_start);

        while slot <= latest {
            if !self.config.is_in_break(slot) && self.can_add_setup(slot) {
                return Some(slot);
            }
            let next = slot.add_minutes(step);
            if next == slot {
                break; // saturated at end of day
            }
            slot = next;
        }
        None
    }

    /// (slot, count) pairs in slot order, empty slots omitted
    pub fn summary(&self) -> Vec<(ClockTime, usize)> {
        self.occupancy.iter().map(|(s, c)| (*s, *c)).collect()
    }

    pub fn total_setups(&self) -> usize {
        self.occupancy.values().sum()
    }

    /// Clear all state for a fresh trial.
    pub fn reset(&mut self) {
        self.occupancy.clear();
    }
}

impl SetupCapacity for SetupCapacityTracker {
    fn can_add_setup(&self, slot: ClockTime) -> bool {
        self.setups_at(slot) < self.config.max_concurrent_setups
    }

    fn setups_at(&self, slot: ClockTime) -> usize {
        self.occupancy.get(&slot).copied().unwrap_or(0)
    }

    fn excess_at(&self, slot: ClockTime) -> usize {
        self.setups_at(slot)
            .saturating_sub(self.config.max_concurrent_setups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u16, m: u16) -> ClockTime {
        ClockTime::from_hm(h, m).unwrap()
    }

    #[test]
    fn test_capacity_limit_default_three() {
        let mut tracker = SetupCapacityTracker::new(&ClinicConfig::default());
        let slot = t(8, 0);
        for _ in 0..3 {
            assert!(tracker.can_add_setup(slot));
            tracker.add_setup(slot);
        }
        assert_eq!(tracker.setups_at(slot), 3);
        assert!(!tracker.can_add_setup(slot));
        assert_eq!(tracker.excess_at(slot), 0);
    }

    #[test]
    fn test_records_beyond_max_without_refusing() {
        let mut tracker = SetupCapacityTracker::new(&ClinicConfig::default());
        for _ in 0..5 {
            tracker.add_setup(t(9, 0));
        }
        assert_eq!(tracker.setups_at(t(9, 0)), 5);
        assert_eq!(tracker.excess_at(t(9, 0)), 2);
    }

    #[test]
    fn test_next_slot_skips_full_and_break() {
        let mut tracker = SetupCapacityTracker::new(&ClinicConfig::default());
        for _ in 0..3 {
            tracker.add_setup(t(9, 30));
        }
        // 09:30 full, 10:00 is the morning break
        assert_eq!(tracker.find_next_available_slot(t(9, 30)), Some(t(10, 30)));
        assert_eq!(tracker.find_next_available_slot(t(11, 30)), Some(t(11, 30)));
        // lunch 12:00-13:00
        assert_eq!(tracker.find_next_available_slot(t(12, 0)), Some(t(13, 0)));
    }

    #[test]
    fn test_next_slot_respects_closing_buffer() {
        let mut tracker = SetupCapacityTracker::new(&ClinicConfig::default());
        assert_eq!(tracker.find_next_available_slot(t(16, 0)), Some(t(16, 0)));
        assert_eq!(tracker.find_next_available_slot(t(16, 30)), None);

        for _ in 0..3 {
            tracker.add_setup(t(16, 0));
        }
        assert_eq!(tracker.find_next_available_slot(t(15, 45)), Some(t(15, 45)));
        assert_eq!(tracker.find_next_available_slot(t(16, 0)), None);
    }

    #[test]
    fn test_next_slot_never_before_opening() {
        let tracker = SetupCapacityTracker::new(&ClinicConfig::default());
        assert_eq!(tracker.find_next_available_slot(t(6, 0)), Some(t(8, 0)));
    }

    #[test]
    fn test_summary_and_reset() {
        let mut tracker = SetupCapacityTracker::new(&ClinicConfig::default());
        tracker.add_setup(t(9, 0));
        tracker.add_setup(t(8, 0));
        tracker.add_setup(t(9, 0));

        assert_eq!(tracker.summary(), vec![(t(8, 0), 1), (t(9, 0), 2)]);
        assert_eq!(tracker.total_setups(), 3);

        assert!(tracker.remove_setup(t(8, 0)));
        assert!(!tracker.remove_setup(t(8, 0)));

        tracker.reset();
        assert!(tracker.summary().is_empty());
        assert!(tracker.can_add_setup(t(9, 0)));
    }
}
