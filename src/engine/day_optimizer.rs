// ==========================================
// Day Treatment Planner - Day Planning Optimizer
// ==========================================
// Input: patients, staff and roster for one date
// Output: changed start times + congestion score
// ==========================================
// Greedy search:
// 1) occupancy = active patients per setup slot
// 2) score = sum over slots of excess^2
// 3) most congested slot first (excess desc, slot asc),
//    occupants by patient id desc
// 4) a move is kept only if score drops and the staff
//    simulation does not lose assignments
// 5) hard iteration cap
// ==========================================

use crate::config::ClinicConfig;
use crate::domain::patient::Patient;
use crate::domain::protocol::ActionTemplate;
use crate::domain::staff::StaffMember;
use crate::domain::types::ClockTime;
use crate::engine::error::EngineResult;
use crate::engine::protocol_expander::ProtocolLookup;
use crate::engine::setup_capacity::SetupCapacityTracker;
use crate::engine::staff_scheduler::DayRoster;
use crate::engine::timeline::lay_out;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// OptimizationResult
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizationResult {
    pub date: NaiveDate,
    /// Only patients whose start time changed
    pub new_start_times: BTreeMap<String, ClockTime>,
    pub moved_count: usize,
    pub initial_score: u64,
    pub score: u64,
    /// Still sitting in an over-capacity slot when the search stopped
    pub unresolved_patients: Vec<String>,
    /// Protocol could not be expanded; kept at their start time
    pub unplannable_patients: Vec<String>,
    pub iterations: usize,
    pub hit_iteration_cap: bool,
}

impl OptimizationResult {
    pub fn is_resolved(&self) -> bool {
        self.score == 0
    }
}

/// Score of an occupancy profile: sum of squared excess per slot
pub fn congestion_score<'a>(counts: impl IntoIterator<Item = &'a usize>, max: usize) -> u64 {
    counts
        .into_iter()
        .map(|count| {
            let excess = count.saturating_sub(max) as u64;
            excess * excess
        })
        .sum()
}

// ==========================================
// Run state
// ==========================================

#[derive(Debug, Clone)]
struct Placement {
    original_start: ClockTime,
    /// None when the protocol is unknown; the patient never moves
    templates: Option<Vec<ActionTemplate>>,
    setup_offset: u32,
    span: u32,
}

impl Placement {
    fn is_movable(&self) -> bool {
        self.templates.is_some()
    }
}

#[derive(Debug, Clone)]
struct Move {
    patient_id: String,
    from: ClockTime,
    to: ClockTime,
    score: u64,
    unassigned: usize,
}

type Occupancy = BTreeMap<ClockTime, Vec<String>>;

struct DayRun<'a> {
    config: &'a ClinicConfig,
    roster: DayRoster,
    placements: BTreeMap<String, Placement>,
    starts: BTreeMap<String, ClockTime>,
    score: u64,
    unassigned: usize,
}

impl<'a> DayRun<'a> {
    fn new(
        config: &'a ClinicConfig,
        roster: DayRoster,
        placements: BTreeMap<String, Placement>,
    ) -> Self {
        let starts = placements
            .iter()
            .map(|(id, p)| (id.clone(), p.original_start))
            .collect();
        let mut run = Self {
            config,
            roster,
            placements,
            starts,
            score: 0,
            unassigned: 0,
        };
        run.score = run.score_of(&run.occupancy(&run.starts));
        run.unassigned = run.simulate_unassigned(&run.starts);
        run
    }

    fn setup_slot(&self, placement: &Placement, start: ClockTime) -> ClockTime {
        self.config.slot_of(start.add_minutes(placement.setup_offset))
    }

    /// Setup slot -> occupant ids (ascending)
    fn occupancy(&self, starts: &BTreeMap<String, ClockTime>) -> Occupancy {
        let mut occupancy = Occupancy::new();
        for (id, placement) in &self.placements {
            let start = starts.get(id).copied().unwrap_or(placement.original_start);
            occupancy
                .entry(self.setup_slot(placement, start))
                .or_default()
                .push(id.clone());
        }
        occupancy
    }

    fn capacity_of(&self, occupancy: &Occupancy) -> SetupCapacityTracker {
        let mut tracker = SetupCapacityTracker::new(self.config);
        for (slot, ids) in occupancy {
            for _ in ids {
                tracker.add_setup(*slot);
            }
        }
        tracker
    }

    fn score_of(&self, occupancy: &Occupancy) -> u64 {
        let counts: Vec<usize> = occupancy.values().map(Vec::len).collect();
        congestion_score(&counts, self.config.max_concurrent_setups)
    }

    /// Full-day staff assignment with a fresh scheduler.
    ///
    /// Patients in (start, id) order, setup first, continuity to the
    /// setup's staff member. Returns the number of unassigned actions.
    fn simulate_unassigned(&self, starts: &BTreeMap<String, ClockTime>) -> usize {
        let mut scheduler = self.roster.scheduler(self.config);
        let mut order: Vec<(ClockTime, &String)> = starts.iter().map(|(id, s)| (*s, id)).collect();
        order.sort();

        for (start, id) in order {
            let Some(templates) = self.placements.get(id).and_then(|p| p.templates.as_ref()) else {
                continue;
            };
            let layout = lay_out(start, templates);
            scheduler.assign_timeline(templates, &layout);
        }
        scheduler.unassigned_count()
    }

    fn violating_slots(&self, occupancy: &Occupancy) -> Vec<(ClockTime, usize)> {
        let max = self.config.max_concurrent_setups;
        let mut violating: Vec<(ClockTime, usize)> = occupancy
            .iter()
            .filter(|(_, ids)| ids.len() > max)
            .map(|(slot, ids)| (*slot, ids.len() - max))
            .collect();
        violating.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        violating
    }

    fn find_improving_move(&self) -> Option<Move> {
        let occupancy = self.occupancy(&self.starts);

        for (slot, excess) in self.violating_slots(&occupancy) {
            let Some(occupants) = occupancy.get(&slot) else {
                continue;
            };
            debug!(%slot, excess, occupants = occupants.len(), "resolving slot");

            for patient_id in occupants.iter().rev() {
                let Some(placement) = self.placements.get(patient_id) else {
                    continue;
                };
                if !placement.is_movable() {
                    continue;
                }
                if let Some(mv) = self.try_move(patient_id, placement, slot, &occupancy) {
                    return Some(mv);
                }
            }
        }
        None
    }

    fn try_move(
        &self,
        patient_id: &str,
        placement: &Placement,
        current_slot: ClockTime,
        occupancy: &Occupancy,
    ) -> Option<Move> {
        let from = self.starts.get(patient_id).copied()?;

        // capacity as seen without this patient
        let mut tracker = self.capacity_of(occupancy);
        tracker.remove_setup(current_slot);
        debug!(patient_id, setups = tracker.total_setups(), "capacity without patient");

        for candidate in self.candidate_slots(&tracker, current_slot) {
            let Some(to) = self.start_for_setup_slot(placement, candidate) else {
                continue;
            };
            if to.minutes().saturating_add(placement.span) > self.config.day_end.minutes() {
                debug!(patient_id, %to, "move refused: ends after closing");
                continue;
            }

            let mut trial = self.starts.clone();
            trial.insert(patient_id.to_string(), to);

            let score = self.score_of(&self.occupancy(&trial));
            if score >= self.score {
                continue;
            }
            let unassigned = self.simulate_unassigned(&trial);
            if unassigned > self.unassigned {
                debug!(
                    patient_id,
                    %to,
                    unassigned,
                    baseline = self.unassigned,
                    "move refused: staff infeasible"
                );
                continue;
            }

            return Some(Move {
                patient_id: patient_id.to_string(),
                from,
                to,
                score,
                unassigned,
            });
        }
        None
    }

    /// Free slots after the current one, then wrapping from opening.
    fn candidate_slots(&self, tracker: &SetupCapacityTracker, current_slot: ClockTime) -> Vec<ClockTime> {
        let step = self.config.slot_minutes.max(1);
        let mut slots = Vec::new();

        let mut cursor = current_slot;
        while let Some(slot) = tracker.find_next_available_slot(cursor) {
            if slot != current_slot {
                slots.push(slot);
            }
            let next = slot.add_minutes(step);
            if next == slot {
                break;
            }
            cursor = next;
        }

        cursor = self.config.day_start;
        while let Some(slot) = tracker.find_next_available_slot(cursor) {
            if slot >= current_slot {
                break;
            }
            slots.push(slot);
            cursor = slot.add_minutes(step);
        }
        slots
    }

    /// Patient start that puts the setup exactly on `slot`
    fn start_for_setup_slot(&self, placement: &Placement, slot: ClockTime) -> Option<ClockTime> {
        let minutes = slot.minutes().checked_sub(placement.setup_offset)?;
        let start = ClockTime::from_minutes(minutes);
        (start >= self.config.day_start).then_some(start)
    }

    fn apply(&mut self, mv: Move) {
        self.starts.insert(mv.patient_id, mv.to);
        self.score = mv.score;
        self.unassigned = mv.unassigned;
    }

    /// Occupants beyond capacity, highest ids first within each slot
    fn unresolved(&self) -> Vec<String> {
        let occupancy = self.occupancy(&self.starts);
        let mut unresolved: Vec<String> = self
            .violating_slots(&occupancy)
            .into_iter()
            .filter_map(|(slot, excess)| occupancy.get(&slot).map(|ids| (ids, excess)))
            .flat_map(|(ids, excess)| ids.iter().rev().take(excess).cloned())
            .collect();
        unresolved.sort();
        unresolved
    }
}

// ==========================================
// DayPlanningOptimizer
// ==========================================
pub struct DayPlanningOptimizer<P>
where
    P: ProtocolLookup,
{
    protocols: Arc<P>,
    config: ClinicConfig,
}

impl<P> DayPlanningOptimizer<P>
where
    P: ProtocolLookup,
{
    /// # Arguments
    /// - `protocols`: protocol reference data
    /// - `config`: validated here; invalid config is rejected up front
    pub fn new(protocols: Arc<P>, config: ClinicConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { protocols, config })
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    /// Rebalance one day's start times.
    ///
    /// # Arguments
    /// - `patients`: any patients; only active ones scheduled on `date` take part
    /// - `staff`: staff list
    /// - `date`: planning date, also fixes the weekday
    /// - `rostered_staff_names`: empty means every staff member
    /// - `coordinator_name`: staff member held to the coordinator cap
    ///
    /// Never fails: unknown protocols and unmovable patients are reported
    /// in the result.
    #[instrument(skip(self, patients, staff, date, rostered_staff_names), fields(
        date = %date,
        patients = patients.len(),
        staff = staff.len()
    ))]
    pub fn optimize(
        &self,
        patients: &[Patient],
        staff: &[StaffMember],
        date: NaiveDate,
        rostered_staff_names: &[String],
        coordinator_name: Option<&str>,
    ) -> OptimizationResult {
        let roster = DayRoster::new(staff, date, rostered_staff_names, coordinator_name);
        let placements = self.place(patients, date);
        let unplannable_patients: Vec<String> = placements
            .iter()
            .filter(|(_, p)| !p.is_movable())
            .map(|(id, _)| id.clone())
            .collect();

        let mut run = DayRun::new(&self.config, roster, placements);
        let initial_score = run.score;
        let mut iterations = 0;
        let mut hit_iteration_cap = false;

        while run.score > 0 {
            if iterations >= self.config.max_optimizer_iterations {
                hit_iteration_cap = true;
                warn!(
                    iterations,
                    score = run.score,
                    "optimizer iteration cap reached, returning best state"
                );
                break;
            }
            iterations += 1;

            let Some(mv) = run.find_improving_move() else {
                debug!(score = run.score, "no improving move left");
                break;
            };
            debug!(
                patient_id = %mv.patient_id,
                from = %mv.from,
                to = %mv.to,
                score = mv.score,
                "move accepted"
            );
            run.apply(mv);
        }

        let new_start_times: BTreeMap<String, ClockTime> = run
            .starts
            .iter()
            .filter(|(id, start)| {
                run.placements
                    .get(*id)
                    .map_or(false, |p| p.original_start != **start)
            })
            .map(|(id, start)| (id.clone(), *start))
            .collect();

        let result = OptimizationResult {
            date,
            moved_count: new_start_times.len(),
            new_start_times,
            initial_score,
            score: run.score,
            unresolved_patients: run.unresolved(),
            unplannable_patients,
            iterations,
            hit_iteration_cap,
        };

        info!(
            moved_count = result.moved_count,
            initial_score = result.initial_score,
            score = result.score,
            unresolved = result.unresolved_patients.len(),
            unplannable = result.unplannable_patients.len(),
            iterations = result.iterations,
            "day optimization finished"
        );
        result
    }

    fn place(&self, patients: &[Patient], date: NaiveDate) -> BTreeMap<String, Placement> {
        let mut placements = BTreeMap::new();

        for patient in patients
            .iter()
            .filter(|p| p.is_scheduled_on(date) && p.is_active())
        {
            let placement = match self
                .protocols
                .expand(&patient.medication_id, patient.treatment_number)
            {
                Ok(templates) => {
                    let layout = lay_out(patient.start_time, &templates);
                    Placement {
                        original_start: patient.start_time,
                        setup_offset: layout.setup_offset_minutes,
                        span: layout.span_minutes(),
                        templates: Some(templates),
                    }
                }
                Err(err) => {
                    warn!(patient_id = %patient.id, error = %err, "patient kept at its start time");
                    Placement {
                        original_start: patient.start_time,
                        templates: None,
                        setup_offset: 0,
                        span: 0,
                    }
                }
            };

            if placements.insert(patient.id.clone(), placement).is_some() {
                warn!(patient_id = %patient.id, "duplicate patient id, later record wins");
            }
        }
        placements
    }
}
