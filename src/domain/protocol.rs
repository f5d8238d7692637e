// ==========================================
// Day Treatment Planner - Protocol reference data
// ==========================================
// Read-only: medication id + treatment number -> ordered action templates
// ==========================================

use crate::domain::types::ActionKind;
use serde::{Deserialize, Serialize};

/// One step of a protocol variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub name: String,
    pub kind: ActionKind,
    pub duration_minutes: u32,
    #[serde(default)]
    pub check_offset_minutes: Option<i32>,
}

impl ActionTemplate {
    pub fn new(name: &str, kind: ActionKind, duration_minutes: u32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            duration_minutes,
            check_offset_minutes: None,
        }
    }

    pub fn with_check_offset(mut self, offset_minutes: i32) -> Self {
        self.check_offset_minutes = Some(offset_minutes);
        self
    }

    /// Positioned relative to the infusion rather than sequentially
    pub fn is_offset_timed(&self) -> bool {
        self.kind.uses_check_offset() && self.check_offset_minutes.is_some()
    }
}

/// Protocol variant for one medication and treatment number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVariant {
    pub medication_id: String,
    pub treatment_number: u32,
    /// Also serves higher treatment numbers that have no exact variant
    #[serde(default)]
    pub applies_to_later_treatments: bool,
    pub actions: Vec<ActionTemplate>,
}

impl ProtocolVariant {
    pub fn new(medication_id: &str, treatment_number: u32, actions: Vec<ActionTemplate>) -> Self {
        Self {
            medication_id: medication_id.to_string(),
            treatment_number,
            applies_to_later_treatments: false,
            actions,
        }
    }

    pub fn for_later_treatments(mut self) -> Self {
        self.applies_to_later_treatments = true;
        self
    }

    pub fn has_infusion(&self) -> bool {
        self.actions.iter().any(|a| a.kind == ActionKind::Infusion)
    }
}
