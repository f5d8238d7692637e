// ==========================================
// Day Treatment Planner - Staff Scheduler
// ==========================================
// Per-run allocator: one instance per planning run, never shared.
// Red lines:
// 1) assigned minutes never exceed max_work_minutes (when set)
// 2) assigned patients never exceed max_patients
//    (coordinator: coordinator_max_patients instead)
// ==========================================
// Selection order (smallest key wins):
//   continuity -> patients -> minutes -> name
// ==========================================

use crate::config::ClinicConfig;
use crate::domain::staff::StaffMember;
use crate::domain::types::{ActionKind, ClockTime};
use crate::engine::timeline::{TimedStep, TimelineLayout};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ==========================================
// StaffAssignment - outcome of one request
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "staff_name", rename_all = "snake_case")]
pub enum StaffAssignment {
    Assigned(String),
    /// Nobody eligible; surfaced for manual resolution
    Unassigned,
    /// Kind runs without staff (infusion, observation)
    NotRequired,
}

impl StaffAssignment {
    pub fn staff_name(&self) -> Option<&str> {
        match self {
            StaffAssignment::Assigned(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, StaffAssignment::Unassigned)
    }
}

/// One recorded assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentRecord {
    pub start_time: ClockTime,
    pub duration_minutes: u32,
    pub kind: ActionKind,
}

/// Running totals for one staff member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffLoad {
    pub name: String,
    pub minutes: u32,
    pub patients: u32,
    pub patient_cap: u32,
    pub max_work_minutes: Option<u32>,
    pub is_coordinator: bool,
    pub assignments: Vec<AssignmentRecord>,
}

impl StaffLoad {
    fn new(member: &StaffMember, is_coordinator: bool, coordinator_cap: u32) -> Self {
        Self {
            name: member.name.clone(),
            minutes: 0,
            patients: 0,
            patient_cap: if is_coordinator {
                coordinator_cap
            } else {
                member.max_patients
            },
            max_work_minutes: member.max_work_minutes,
            is_coordinator,
            assignments: Vec::new(),
        }
    }

    /// Both ceilings hold after taking on the extra work
    pub fn can_take(&self, extra_minutes: u32, extra_patients: u32) -> bool {
        let patients_ok = self.patients.saturating_add(extra_patients) <= self.patient_cap;
        let minutes_ok = self
            .max_work_minutes
            .map_or(true, |max| self.minutes.saturating_add(extra_minutes) <= max);
        patients_ok && minutes_ok
    }

    pub fn remaining_minutes(&self) -> Option<u32> {
        self.max_work_minutes.map(|max| max.saturating_sub(self.minutes))
    }

    fn selection_key<'a>(&'a self, preferred: Option<&str>) -> SelectionKey<'a> {
        SelectionKey {
            not_preferred: preferred != Some(self.name.as_str()),
            patients: self.patients,
            minutes: self.minutes,
            name: self.name.as_str(),
        }
    }
}

// ==========================================
// SelectionKey - staff comparator
// ==========================================
// Field order is the tie-break order. `not_preferred = false` sorts first,
// so the setup's staff member keeps the patient whenever still eligible.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SelectionKey<'a> {
    pub not_preferred: bool,
    pub patients: u32,
    pub minutes: u32,
    pub name: &'a str,
}

// ==========================================
// StaffScheduler
// ==========================================
#[derive(Debug, Clone)]
pub struct StaffScheduler {
    weekday: Weekday,
    coordinator: Option<String>,
    loads: BTreeMap<String, StaffLoad>,
    unassigned_count: usize,
}

impl StaffScheduler {
    /// Build for one run.
    ///
    /// # Arguments
    /// - `staff`: staff rostered for the day
    /// - `weekday`: members not working this weekday are dropped
    /// - `coordinator`: staff member with the smaller coordinator cap
    /// - `config`: supplies the coordinator cap
    pub fn new(
        staff: &[StaffMember],
        weekday: Weekday,
        coordinator: Option<&str>,
        config: &ClinicConfig,
    ) -> Self {
        let mut loads = BTreeMap::new();
        for member in staff.iter().filter(|m| m.works_on(weekday)) {
            if loads.contains_key(&member.name) {
                warn!(staff = %member.name, "duplicate staff name ignored");
                continue;
            }
            let is_coordinator = coordinator == Some(member.name.as_str());
            loads.insert(
                member.name.clone(),
                StaffLoad::new(member, is_coordinator, config.coordinator_max_patients),
            );
        }

        let coordinator = coordinator.map(str::to_string);
        if let Some(name) = &coordinator {
            if !loads.contains_key(name) {
                debug!(coordinator = %name, %weekday, "coordinator not rostered for this day");
            }
        }

        Self {
            weekday,
            coordinator,
            loads,
            unassigned_count: 0,
        }
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn coordinator(&self) -> Option<&str> {
        self.coordinator.as_deref()
    }

    pub fn staff_count(&self) -> usize {
        self.loads.len()
    }

    /// Requests that ended Unassigned during this run
    pub fn unassigned_count(&self) -> usize {
        self.unassigned_count
    }

    // ==========================================
    // Assignment
    // ==========================================

    /// Assign a setup; the chosen member takes on one more patient.
    pub fn assign_for_setup(&mut self, start_time: ClockTime, duration: u32) -> StaffAssignment {
        self.assign(ActionKind::Setup, duration, start_time, None, 1)
    }

    /// Assign a staffed non-setup action.
    ///
    /// `preferred_staff` (usually whoever did the patient's setup) wins
    /// while still eligible; otherwise least-loaded selection applies.
    /// Infusion and observation need nobody and return `NotRequired`.
    pub fn assign_for_action(
        &mut self,
        kind: ActionKind,
        duration: u32,
        start_time: ClockTime,
        preferred_staff: Option<&str>,
    ) -> StaffAssignment {
        if !kind.requires_staff() {
            return StaffAssignment::NotRequired;
        }
        if kind == ActionKind::Setup {
            return self.assign_for_setup(start_time, duration);
        }
        self.assign(kind, duration, start_time, preferred_staff, 0)
    }

    fn assign(
        &mut self,
        kind: ActionKind,
        duration: u32,
        start_time: ClockTime,
        preferred: Option<&str>,
        extra_patients: u32,
    ) -> StaffAssignment {
        let chosen = self
            .select(duration, extra_patients, preferred)
            .map(|load| load.name.clone());

        let Some(name) = chosen else {
            self.unassigned_count += 1;
            debug!(%kind, %start_time, duration, "no eligible staff member");
            return StaffAssignment::Unassigned;
        };

        if let Some(load) = self.loads.get_mut(&name) {
            load.minutes = load.minutes.saturating_add(duration);
            load.patients = load.patients.saturating_add(extra_patients);
            load.assignments.push(AssignmentRecord {
                start_time,
                duration_minutes: duration,
                kind,
            });
            debug!(
                staff = %name,
                %kind,
                %start_time,
                minutes = load.minutes,
                patients = load.patients,
                "staff assigned"
            );
        }
        StaffAssignment::Assigned(name)
    }

    /// Eligible member with the smallest selection key
    pub fn select(
        &self,
        duration: u32,
        extra_patients: u32,
        preferred: Option<&str>,
    ) -> Option<&StaffLoad> {
        self.loads
            .values()
            .filter(|load| load.can_take(duration, extra_patients))
            .min_by(|a, b| compare(a, b, preferred))
    }

    /// Assign staff across one patient's laid-out timeline.
    ///
    /// Setups are assigned first so every later staffed action can prefer
    /// the setup's staff member. Returns one outcome per step.
    pub fn assign_timeline<T: TimedStep>(
        &mut self,
        steps: &[T],
        layout: &TimelineLayout,
    ) -> Vec<StaffAssignment> {
        let start_of = |idx: usize| layout.steps.get(idx).map(|t| t.start).unwrap_or(layout.start);
        let mut outcomes = vec![StaffAssignment::NotRequired; steps.len()];
        let mut setup_staff: Option<String> = None;

        for (idx, step) in steps.iter().enumerate() {
            if step.kind() != ActionKind::Setup {
                continue;
            }
            let outcome = self.assign_for_setup(start_of(idx), step.duration());
            if setup_staff.is_none() {
                setup_staff = outcome.staff_name().map(str::to_string);
            }
            outcomes[idx] = outcome;
        }

        for (idx, step) in steps.iter().enumerate() {
            if step.kind() == ActionKind::Setup {
                continue;
            }
            outcomes[idx] = self.assign_for_action(
                step.kind(),
                step.duration(),
                start_of(idx),
                setup_staff.as_deref(),
            );
        }

        outcomes
    }

    // ==========================================
    // Diagnostics
    // ==========================================

    pub fn load_of(&self, name: &str) -> Option<&StaffLoad> {
        self.loads.get(name)
    }

    /// Per-staff totals in name order
    pub fn loads(&self) -> Vec<StaffLoad> {
        self.loads.values().cloned().collect()
    }
}

// ==========================================
// DayRoster - who may be scheduled on a date
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRoster {
    pub weekday: Weekday,
    pub staff: Vec<StaffMember>,
    pub coordinator: Option<String>,
}

impl DayRoster {
    /// Explicitly rostered names win; an empty name list means all staff.
    pub fn new(
        staff: &[StaffMember],
        date: NaiveDate,
        rostered_names: &[String],
        coordinator: Option<&str>,
    ) -> Self {
        let staff = if rostered_names.is_empty() {
            staff.to_vec()
        } else {
            staff
                .iter()
                .filter(|m| rostered_names.iter().any(|n| n == &m.name))
                .cloned()
                .collect()
        };
        let weekday = date.weekday();
        if let Some(name) = coordinator {
            if !staff.iter().any(|m| m.name == name && m.works_on(weekday)) {
                warn!(coordinator = %name, %date, "coordinator not rostered for this day");
            }
        }

        Self {
            weekday,
            staff,
            coordinator: coordinator.map(str::to_string),
        }
    }

    /// Fresh scheduler with zeroed loads
    pub fn scheduler(&self, config: &ClinicConfig) -> StaffScheduler {
        StaffScheduler::new(&self.staff, self.weekday, self.coordinator.as_deref(), config)
    }
}

fn compare(a: &StaffLoad, b: &StaffLoad, preferred: Option<&str>) -> Ordering {
    a.selection_key(preferred).cmp(&b.selection_key(preferred))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u16, m: u16) -> ClockTime {
        ClockTime::from_hm(h, m).unwrap()
    }

    fn member(name: &str, max_patients: u32, max_minutes: Option<u32>) -> StaffMember {
        StaffMember {
            name: name.to_string(),
            max_patients,
            max_work_minutes: max_minutes,
            work_days: vec![],
        }
    }

    fn scheduler(staff: &[StaffMember], coordinator: Option<&str>) -> StaffScheduler {
        StaffScheduler::new(staff, Weekday::Mon, coordinator, &ClinicConfig::default())
    }

    #[test]
    fn test_selection_key_order() {
        let a = SelectionKey { not_preferred: false, patients: 5, minutes: 300, name: "Zoe" };
        let b = SelectionKey { not_preferred: true, patients: 0, minutes: 0, name: "Ann" };
        assert!(a < b);

        let c = SelectionKey { not_preferred: true, patients: 1, minutes: 10, name: "Bob" };
        let d = SelectionKey { not_preferred: true, patients: 1, minutes: 10, name: "Ann" };
        assert!(d < c);
    }

    #[test]
    fn test_setup_goes_to_least_loaded_then_name() {
        let mut s = scheduler(&[member("Bram", 5, None), member("Anna", 5, None)], None);

        assert_eq!(s.assign_for_setup(t(8, 0), 30), StaffAssignment::Assigned("Anna".into()));
        assert_eq!(s.assign_for_setup(t(8, 0), 30), StaffAssignment::Assigned("Bram".into()));
        assert_eq!(s.assign_for_setup(t(8, 30), 30), StaffAssignment::Assigned("Anna".into()));

        let anna = s.load_of("Anna").unwrap();
        assert_eq!(anna.patients, 2);
        assert_eq!(anna.minutes, 60);
        assert_eq!(anna.assignments.len(), 2);
    }

    #[test]
    fn test_patient_cap_enforced() {
        let mut s = scheduler(&[member("Anna", 1, None)], None);
        assert!(s.assign_for_setup(t(8, 0), 30).staff_name().is_some());
        assert!(s.assign_for_setup(t(8, 30), 30).is_unassigned());
        assert_eq!(s.unassigned_count(), 1);
    }

    #[test]
    fn test_work_minutes_cap_blocks_action() {
        // 360-minute cap already carrying 350 minutes
        let mut s = scheduler(&[member("Anna", 5, Some(360))], None);
        assert_eq!(s.assign_for_setup(t(8, 0), 350), StaffAssignment::Assigned("Anna".into()));

        let result = s.assign_for_action(ActionKind::Removal, 20, t(14, 0), Some("Anna"));
        assert_eq!(result, StaffAssignment::Unassigned);
        assert_eq!(s.load_of("Anna").unwrap().minutes, 350);
    }

    #[test]
    fn test_work_minutes_cap_falls_back_to_other_staff() {
        let mut s = scheduler(&[member("Anna", 5, Some(360)), member("Bram", 5, Some(360))], None);
        s.assign_for_setup(t(8, 0), 350); // Anna
        let result = s.assign_for_action(ActionKind::Removal, 20, t(14, 0), Some("Anna"));
        assert_eq!(result, StaffAssignment::Assigned("Bram".into()));
        assert_eq!(s.load_of("Anna").unwrap().remaining_minutes(), Some(10));
    }

    #[test]
    fn test_exact_ceiling_is_allowed() {
        let mut s = scheduler(&[member("Anna", 5, Some(360))], None);
        s.assign_for_setup(t(8, 0), 340);
        let result = s.assign_for_action(ActionKind::Check, 20, t(9, 0), None);
        assert_eq!(result, StaffAssignment::Assigned("Anna".into()));
        assert_eq!(s.load_of("Anna").unwrap().minutes, 360);
    }

    #[test]
    fn test_continuity_beats_load_balance() {
        let mut s = scheduler(&[member("Anna", 5, None), member("Bram", 5, None)], None);
        s.assign_for_setup(t(8, 0), 30); // Anna
        s.assign_for_setup(t(8, 0), 30); // Bram
        s.assign_for_setup(t(8, 30), 30); // Anna, now busier

        let result = s.assign_for_action(ActionKind::Removal, 15, t(10, 0), Some("Anna"));
        assert_eq!(result, StaffAssignment::Assigned("Anna".into()));

        let no_preference = s.assign_for_action(ActionKind::Removal, 15, t(10, 0), None);
        assert_eq!(no_preference, StaffAssignment::Assigned("Bram".into()));
    }

    #[test]
    fn test_non_setup_actions_do_not_count_patients() {
        let mut s = scheduler(&[member("Anna", 1, None)], None);
        s.assign_for_setup(t(8, 0), 30);
        let check = s.assign_for_action(ActionKind::ProtocolCheck, 10, t(8, 30), Some("Anna"));
        assert_eq!(check, StaffAssignment::Assigned("Anna".into()));
        assert_eq!(s.load_of("Anna").unwrap().patients, 1);
    }

    #[test]
    fn test_unstaffed_kinds() {
        let mut s = scheduler(&[member("Anna", 5, None)], None);
        assert_eq!(
            s.assign_for_action(ActionKind::Infusion, 120, t(9, 0), None),
            StaffAssignment::NotRequired
        );
        assert_eq!(
            s.assign_for_action(ActionKind::Observation, 30, t(11, 0), None),
            StaffAssignment::NotRequired
        );
        assert_eq!(s.load_of("Anna").unwrap().minutes, 0);
    }

    #[test]
    fn test_setup_kind_through_action_entry_counts_patient() {
        let mut s = scheduler(&[member("Anna", 5, None)], None);
        s.assign_for_action(ActionKind::Setup, 30, t(8, 0), None);
        assert_eq!(s.load_of("Anna").unwrap().patients, 1);
    }

    #[test]
    fn test_coordinator_uses_smaller_cap() {
        // default coordinator cap = 2
        let mut s = scheduler(&[member("Anna", 6, None)], Some("Anna"));
        assert_eq!(s.coordinator(), Some("Anna"));
        assert!(s.load_of("Anna").unwrap().is_coordinator);

        assert!(s.assign_for_setup(t(8, 0), 30).staff_name().is_some());
        assert!(s.assign_for_setup(t(8, 30), 30).staff_name().is_some());
        assert!(s.assign_for_setup(t(9, 0), 30).is_unassigned());
    }

    #[test]
    fn test_coordinator_still_bound_by_minutes() {
        let mut s = scheduler(&[member("Anna", 6, Some(40))], Some("Anna"));
        assert!(s.assign_for_setup(t(8, 0), 30).staff_name().is_some());
        assert!(s.assign_for_setup(t(8, 30), 30).is_unassigned());
    }

    #[test]
    fn test_weekday_filter_and_duplicates() {
        let mut off_monday = member("Cees", 5, None);
        off_monday.work_days = vec![Weekday::Tue];
        let s = scheduler(
            &[member("Anna", 5, None), off_monday, member("Anna", 9, None)],
            Some("Dirk"),
        );
        assert_eq!(s.staff_count(), 1);
        assert!(s.load_of("Cees").is_none());
        assert_eq!(s.load_of("Anna").unwrap().patient_cap, 5);
    }

    #[test]
    fn test_no_staff_is_unassigned_not_panic() {
        let mut s = scheduler(&[], None);
        assert!(s.assign_for_setup(t(8, 0), 30).is_unassigned());
        assert!(s.assign_for_action(ActionKind::Check, 5, t(9, 0), None).is_unassigned());
        assert_eq!(s.unassigned_count(), 2);
    }

    #[test]
    fn test_assign_timeline_keeps_setup_staff() {
        use crate::domain::protocol::ActionTemplate;
        use crate::engine::timeline::lay_out;

        let mut s = scheduler(&[member("Anna", 5, None), member("Bram", 5, None)], None);
        s.assign_for_setup(t(7, 0), 30); // Anna busier, next setup goes to Bram

        let steps = vec![
            ActionTemplate::new("Protocol check", ActionKind::ProtocolCheck, 10),
            ActionTemplate::new("Setup", ActionKind::Setup, 30),
            ActionTemplate::new("Infusion", ActionKind::Infusion, 60),
            ActionTemplate::new("Check", ActionKind::Check, 5).with_check_offset(30),
            ActionTemplate::new("Removal", ActionKind::Removal, 15),
        ];
        let layout = lay_out(t(8, 0), &steps);
        let outcomes = s.assign_timeline(&steps, &layout);

        assert_eq!(outcomes[1], StaffAssignment::Assigned("Bram".into()));
        assert_eq!(outcomes[0], StaffAssignment::Assigned("Bram".into()));
        assert_eq!(outcomes[2], StaffAssignment::NotRequired);
        assert_eq!(outcomes[3], StaffAssignment::Assigned("Bram".into()));
        assert_eq!(outcomes[4], StaffAssignment::Assigned("Bram".into()));

        let bram = s.load_of("Bram").unwrap();
        assert_eq!(bram.patients, 1);
        assert_eq!(bram.minutes, 10 + 30 + 5 + 15);
        assert_eq!(bram.assignments[0].start_time, t(8, 10));
    }

    #[test]
    fn test_day_roster_selection() {
        let staff = vec![member("Anna", 5, None), member("Bram", 5, None), member("Cees", 5, None)];
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(); // Monday

        let all = DayRoster::new(&staff, date, &[], Some("Bram"));
        assert_eq!(all.weekday, Weekday::Mon);
        assert_eq!(all.staff.len(), 3);

        let named = DayRoster::new(&staff, date, &["Cees".to_string(), "Anna".to_string()], None);
        let names: Vec<&str> = named.staff.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Anna", "Cees"]);
        assert_eq!(named.scheduler(&ClinicConfig::default()).staff_count(), 2);
    }

    #[test]
    fn test_clone_is_independent_trial() {
        let mut s = scheduler(&[member("Anna", 5, None)], None);
        let mut trial = s.clone();
        trial.assign_for_setup(t(8, 0), 30);
        assert_eq!(s.load_of("Anna").unwrap().patients, 0);
        s.assign_for_setup(t(8, 0), 30);
        assert_eq!(s.loads(), trial.loads());
    }
}
