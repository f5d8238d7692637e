// ==========================================
// Test data builders for integration tests
// ==========================================

use chrono::{NaiveDate, Weekday};
use day_treatment_planner::domain::{
    ActionKind, ActionTemplate, ClockTime, Patient, ProtocolVariant, StaffMember,
};
use day_treatment_planner::engine::ProtocolExpander;
use std::sync::Arc;

/// HH:MM shorthand
pub fn t(hour: u16, minute: u16) -> ClockTime {
    ClockTime::from_hm(hour, minute).unwrap()
}

/// Monday 2 March 2026
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

// ==========================================
// Patient builder
// ==========================================

pub struct PatientBuilder {
    id: String,
    name: Option<String>,
    start_time: ClockTime,
    scheduled_date: NaiveDate,
    medication_id: String,
    treatment_number: u32,
    no_show: bool,
    late_cancellation: bool,
    medication_discarded: bool,
}

impl PatientBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            start_time: t(8, 0),
            scheduled_date: test_date(),
            medication_id: "MED-STD".to_string(),
            treatment_number: 1,
            no_show: false,
            late_cancellation: false,
            medication_discarded: false,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn start(mut self, hour: u16, minute: u16) -> Self {
        self.start_time = t(hour, minute);
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = date;
        self
    }

    pub fn medication(mut self, medication_id: &str, treatment_number: u32) -> Self {
        self.medication_id = medication_id.to_string();
        self.treatment_number = treatment_number;
        self
    }

    pub fn no_show(mut self) -> Self {
        self.no_show = true;
        self
    }

    pub fn late_cancellation(mut self) -> Self {
        self.late_cancellation = true;
        self
    }

    pub fn medication_discarded(mut self) -> Self {
        self.medication_discarded = true;
        self
    }

    pub fn build(self) -> Patient {
        Patient {
            name: self.name.unwrap_or_else(|| format!("Patient {}", self.id)),
            id: self.id,
            start_time: self.start_time,
            scheduled_date: self.scheduled_date,
            medication_id: self.medication_id,
            treatment_number: self.treatment_number,
            no_show: self.no_show,
            late_cancellation: self.late_cancellation,
            medication_discarded: self.medication_discarded,
            actions: Vec::new(),
        }
    }
}

/// `count` patients P01.. all starting at the same time
pub fn patients_at(count: usize, hour: u16, minute: u16) -> Vec<Patient> {
    (1..=count)
        .map(|i| PatientBuilder::new(&format!("P{:02}", i)).start(hour, minute).build())
        .collect()
}

// ==========================================
// Staff builder
// ==========================================

pub struct StaffBuilder {
    name: String,
    max_patients: u32,
    max_work_minutes: Option<u32>,
    work_days: Vec<Weekday>,
}

impl StaffBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            max_patients: 8,
            max_work_minutes: None,
            work_days: Vec::new(),
        }
    }

    pub fn max_patients(mut self, max: u32) -> Self {
        self.max_patients = max;
        self
    }

    pub fn max_work_minutes(mut self, max: u32) -> Self {
        self.max_work_minutes = Some(max);
        self
    }

    pub fn works_on(mut self, days: &[Weekday]) -> Self {
        self.work_days = days.to_vec();
        self
    }

    pub fn build(self) -> StaffMember {
        StaffMember {
            name: self.name,
            max_patients: self.max_patients,
            max_work_minutes: self.max_work_minutes,
            work_days: self.work_days,
        }
    }
}

pub fn default_staff() -> Vec<StaffMember> {
    vec![
        StaffBuilder::new("Anna").build(),
        StaffBuilder::new("Bram").build(),
        StaffBuilder::new("Cees").build(),
    ]
}

// ==========================================
// Protocol fixtures
// ==========================================

/// Setup 30, infusion 60, check at +30, removal 15
pub fn standard_protocol() -> ProtocolVariant {
    ProtocolVariant::new(
        "MED-STD",
        1,
        vec![
            ActionTemplate::new("Setup", ActionKind::Setup, 30),
            ActionTemplate::new("Infusion", ActionKind::Infusion, 60),
            ActionTemplate::new("Check", ActionKind::Check, 5).with_check_offset(30),
            ActionTemplate::new("Removal", ActionKind::Removal, 15),
        ],
    )
}

/// Protocol check before setup, long infusion, switch check, observation
pub fn long_protocol() -> ProtocolVariant {
    ProtocolVariant::new(
        "MED-LONG",
        1,
        vec![
            ActionTemplate::new("Protocol check", ActionKind::ProtocolCheck, 10),
            ActionTemplate::new("Setup", ActionKind::Setup, 20),
            ActionTemplate::new("Infusion", ActionKind::Infusion, 180),
            ActionTemplate::new("Check 30", ActionKind::Check, 5).with_check_offset(30),
            ActionTemplate::new("Switch check", ActionKind::ProtocolSwitchCheck, 5)
                .with_check_offset(90),
            ActionTemplate::new("Observation", ActionKind::Observation, 30),
            ActionTemplate::new("Removal", ActionKind::Removal, 10),
        ],
    )
    .for_later_treatments()
}

pub fn protocol_fixtures() -> Vec<ProtocolVariant> {
    vec![standard_protocol(), long_protocol()]
}

pub fn expander() -> Arc<ProtocolExpander> {
    Arc::new(ProtocolExpander::new(protocol_fixtures()).unwrap())
}
