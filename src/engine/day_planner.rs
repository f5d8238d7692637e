// ==========================================
// Day Treatment Planner - Day planner
// ==========================================
// Flow:
// 1) optimizer proposes start times
// 2) every active patient is re-expanded at its final start
// 3) staff assigned for real with a fresh scheduler
//    (patients in (start, id) order)
// 4) result is a set of per-patient timeline replacements
// ==========================================
// The planner computes instructions only. Callers apply each
// TimelineReplacement as one unit (see DayPlan::apply_to).
// ==========================================

use crate::config::ClinicConfig;
use crate::domain::patient::{Action, Patient};
use crate::domain::protocol::ProtocolVariant;
use crate::domain::slot::TimeSlot;
use crate::domain::staff::StaffMember;
use crate::domain::types::{ActionKind, ClockTime};
use crate::engine::analytics::WorkloadAnalytics;
use crate::engine::day_optimizer::{DayPlanningOptimizer, OptimizationResult};
use crate::engine::error::EngineResult;
use crate::engine::protocol_expander::{ProtocolExpander, ProtocolLookup};
use crate::engine::staff_scheduler::{DayRoster, StaffLoad};
use crate::engine::timeline::lay_out;
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// DayRequest - input document
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayRequest {
    pub date: NaiveDate,
    pub patients: Vec<Patient>,
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub rostered_staff_names: Vec<String>,
    #[serde(default)]
    pub coordinator_name: Option<String>,
    /// Clinic defaults apply when absent
    #[serde(default)]
    pub config: Option<ClinicConfig>,
    #[serde(default)]
    pub protocols: Vec<ProtocolVariant>,
}

impl DayRequest {
    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading day request {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}

// ==========================================
// DayPlan - output
// ==========================================

/// New start time and complete action list for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineReplacement {
    pub patient_id: String,
    pub start_time: ClockTime,
    pub actions: Vec<Action>,
}

/// Staffed action nobody could take; needs manual resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnassignedAction {
    pub patient_id: String,
    pub patient_name: String,
    pub action_id: String,
    pub action_name: String,
    pub kind: ActionKind,
    pub start_time: ClockTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub optimization: OptimizationResult,
    pub timelines: Vec<TimelineReplacement>,
    pub unassigned: Vec<UnassignedAction>,
    pub staff_loads: Vec<StaffLoad>,
    pub occupancy: Vec<TimeSlot>,
    pub warnings: Vec<String>,
}

impl DayPlan {
    /// Replace start time and actions of every planned patient.
    ///
    /// Each patient is rewritten in one step; patients without a
    /// replacement are left untouched. Returns the number rewritten.
    pub fn apply_to(&self, patients: &mut [Patient]) -> usize {
        let mut applied = 0;
        for replacement in &self.timelines {
            let target = patients
                .iter_mut()
                .find(|p| p.id == replacement.patient_id && p.is_scheduled_on(self.date));
            if let Some(patient) = target {
                patient.replace_timeline(replacement.start_time, replacement.actions.clone());
                applied += 1;
            }
        }
        applied
    }

    pub fn timeline_for(&self, patient_id: &str) -> Option<&TimelineReplacement> {
        self.timelines.iter().find(|t| t.patient_id == patient_id)
    }
}

// ==========================================
// DayPlanner
// ==========================================
pub struct DayPlanner<P>
where
    P: ProtocolLookup,
{
    protocols: Arc<P>,
    config: ClinicConfig,
    optimizer: DayPlanningOptimizer<P>,
    analytics: WorkloadAnalytics,
}

impl<P> DayPlanner<P>
where
    P: ProtocolLookup,
{
    pub fn new(protocols: Arc<P>, config: ClinicConfig) -> EngineResult<Self> {
        Ok(Self {
            optimizer: DayPlanningOptimizer::new(protocols.clone(), config.clone())?,
            analytics: WorkloadAnalytics::new(config.clone()),
            protocols,
            config,
        })
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    /// Plan one day end to end.
    ///
    /// Only the day fields of the request are read here; protocol data
    /// and config are fixed when the planner is built.
    #[instrument(skip(self, request), fields(date = %request.date, patients = request.patients.len()))]
    pub fn plan_day(&self, request: &DayRequest) -> DayPlan {
        let optimization = self.optimizer.optimize(
            &request.patients,
            &request.staff,
            request.date,
            &request.rostered_staff_names,
            request.coordinator_name.as_deref(),
        );

        // final positions of the day's active patients
        let mut day_patients: Vec<Patient> = request
            .patients
            .iter()
            .filter(|p| p.is_scheduled_on(request.date) && p.is_active())
            .cloned()
            .collect();
        for patient in &mut day_patients {
            if let Some(start) = optimization.new_start_times.get(&patient.id) {
                patient.start_time = *start;
            }
        }
        day_patients.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));

        let roster = DayRoster::new(
            &request.staff,
            request.date,
            &request.rostered_staff_names,
            request.coordinator_name.as_deref(),
        );
        let mut scheduler = roster.scheduler(&self.config);
        let mut timelines = Vec::new();
        let mut unassigned = Vec::new();

        for patient in &day_patients {
            let templates = match self
                .protocols
                .expand(&patient.medication_id, patient.treatment_number)
            {
                Ok(templates) => templates,
                Err(_) => continue, // reported by the optimizer as unplannable
            };
            let layout = lay_out(patient.start_time, &templates);
            let outcomes = scheduler.assign_timeline(&templates, &layout);

            let mut actions = Vec::with_capacity(templates.len());
            for ((template, timing), outcome) in templates.iter().zip(&layout.steps).zip(&outcomes) {
                let action = Action {
                    id: Uuid::new_v4().to_string(),
                    name: template.name.clone(),
                    duration_minutes: template.duration_minutes,
                    kind: template.kind,
                    actual_duration_minutes: None,
                    assigned_staff: outcome.staff_name().map(str::to_string),
                    check_offset_minutes: template.check_offset_minutes,
                    start_time: Some(timing.start),
                    patient_id: patient.id.clone(),
                };
                if outcome.is_unassigned() {
                    unassigned.push(UnassignedAction {
                        patient_id: patient.id.clone(),
                        patient_name: patient.name.clone(),
                        action_id: action.id.clone(),
                        action_name: action.name.clone(),
                        kind: action.kind,
                        start_time: timing.start,
                    });
                }
                actions.push(action);
            }

            if layout.end > self.config.day_end {
                warn!(patient_id = %patient.id, end = %layout.end, "timeline runs past closing");
            }
            timelines.push(TimelineReplacement {
                patient_id: patient.id.clone(),
                start_time: patient.start_time,
                actions,
            });
        }

        // analytics sees the planned setups; unplannable patients count at their start
        for patient in &mut day_patients {
            match timelines.iter().find(|t| t.patient_id == patient.id) {
                Some(timeline) => {
                    patient.replace_timeline(timeline.start_time, timeline.actions.clone());
                }
                None => patient.actions.clear(),
            }
        }

        let mut warnings = self.analytics.warnings(&day_patients);
        warnings.extend(unassigned.iter().map(|u| {
            format!(
                "{} {} for {} at {} has no staff member",
                u.kind, u.action_name, u.patient_name, u.start_time
            )
        }));
        warnings.extend(
            optimization
                .unplannable_patients
                .iter()
                .map(|id| format!("patient {} has no protocol variant and was not planned", id)),
        );

        info!(
            timelines = timelines.len(),
            moved = optimization.moved_count,
            unassigned = unassigned.len(),
            warnings = warnings.len(),
            "day plan ready"
        );

        DayPlan {
            date: request.date,
            occupancy: self.analytics.occupancy_by_time_slot(&day_patients),
            staff_loads: scheduler.loads(),
            optimization,
            timelines,
            unassigned,
            warnings,
        }
    }
}

impl DayPlanner<ProtocolExpander> {
    /// Build from the protocol catalog and config carried by a request.
    pub fn from_request(request: &DayRequest) -> EngineResult<Self> {
        let protocols = ProtocolExpander::new(request.protocols.clone())?;
        let config = request.config.clone().unwrap_or_default();
        Self::new(Arc::new(protocols), config)
    }
}

/// Load-and-plan in one call
pub fn plan_request(request: &DayRequest) -> EngineResult<DayPlan> {
    Ok(DayPlanner::from_request(request)?.plan_day(request))
}
