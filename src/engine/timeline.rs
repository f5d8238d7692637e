// ==========================================
// Day Treatment Planner - Timeline layout
// ==========================================
// Rules:
// 1) sequential steps start where the previous sequential step ended
// 2) offset-timed checks start at (owning infusion start + offset)
//    and never move the sequential cursor
// 3) offset-timed durations still count toward occupancy
// ==========================================

use crate::domain::patient::Action;
use crate::domain::protocol::ActionTemplate;
use crate::domain::types::{ActionKind, ClockTime};
use serde::Serialize;

// ==========================================
// Trait: TimedStep
// ==========================================
// Shared by protocol templates and materialized actions
pub trait TimedStep {
    fn kind(&self) -> ActionKind;

    fn duration(&self) -> u32;

    fn check_offset(&self) -> Option<i32>;

    fn is_offset_timed(&self) -> bool {
        self.kind().uses_check_offset() && self.check_offset().is_some()
    }
}

impl TimedStep for ActionTemplate {
    fn kind(&self) -> ActionKind {
        self.kind
    }

    fn duration(&self) -> u32 {
        self.duration_minutes
    }

    fn check_offset(&self) -> Option<i32> {
        self.check_offset_minutes
    }
}

impl TimedStep for Action {
    fn kind(&self) -> ActionKind {
        self.kind
    }

    fn duration(&self) -> u32 {
        self.effective_duration()
    }

    fn check_offset(&self) -> Option<i32> {
        self.check_offset_minutes
    }
}

// ==========================================
// Layout result
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepTiming {
    pub start: ClockTime,
    pub end: ClockTime,
    pub offset_timed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineLayout {
    pub start: ClockTime,
    pub steps: Vec<StepTiming>,
    /// Sum of sequential (non offset-timed) durations
    pub sequential_minutes: u32,
    /// Sequential minutes plus offset-timed durations
    pub occupancy_minutes: u32,
    /// Latest end over all steps, clamped to 23:59 like every ClockTime
    pub end: ClockTime,
    /// Start of the first setup relative to the patient start
    pub setup_offset_minutes: u32,
    /// Latest end in minutes since midnight, not clamped
    #[serde(skip)]
    end_minutes: u32,
}

impl TimelineLayout {
    pub fn setup_start(&self) -> ClockTime {
        self.start.add_minutes(self.setup_offset_minutes)
    }

    /// Minutes from patient start to the latest end, past midnight included
    pub fn span_minutes(&self) -> u32 {
        self.end_minutes.saturating_sub(self.start.minutes())
    }
}

/// Lay out steps from a patient start time.
pub fn lay_out<T: TimedStep>(start: ClockTime, steps: &[T]) -> TimelineLayout {
    // (start, end) in unclamped minutes since midnight
    let mut spans: Vec<Option<(u32, u32)>> = vec![None; steps.len()];
    let mut offset_timed = vec![false; steps.len()];
    let mut infusion_starts: Vec<(usize, u32)> = Vec::new();
    let mut cursor = start.minutes();
    let mut sequential_minutes: u32 = 0;
    let mut occupancy_minutes: u32 = 0;

    // 1. sequential steps
    for (idx, step) in steps.iter().enumerate() {
        occupancy_minutes = occupancy_minutes.saturating_add(step.duration());
        if step.is_offset_timed() {
            continue;
        }
        let end = cursor.saturating_add(step.duration());
        spans[idx] = Some((cursor, end));
        if step.kind() == ActionKind::Infusion {
            infusion_starts.push((idx, cursor));
        }
        sequential_minutes = sequential_minutes.saturating_add(step.duration());
        cursor = end;
    }

    // 2. offset-timed checks anchor on the nearest preceding infusion,
    //    else the first infusion, else the patient start
    for (idx, step) in steps.iter().enumerate() {
        if !step.is_offset_timed() {
            continue;
        }
        let anchor = infusion_starts
            .iter()
            .rev()
            .find(|(i, _)| *i < idx)
            .or_else(|| infusion_starts.first())
            .map(|(_, m)| *m)
            .unwrap_or(start.minutes());
        let shifted = i64::from(anchor) + i64::from(step.check_offset().unwrap_or(0));
        let check_start = u32::try_from(shifted.max(0)).unwrap_or(u32::MAX);
        spans[idx] = Some((check_start, check_start.saturating_add(step.duration())));
        offset_timed[idx] = true;
    }

    let spans: Vec<(u32, u32)> = spans
        .into_iter()
        .map(|span| span.unwrap_or((start.minutes(), start.minutes())))
        .collect();
    let steps_out: Vec<StepTiming> = spans
        .iter()
        .zip(offset_timed)
        .map(|(&(from, to), offset_timed)| StepTiming {
            start: ClockTime::from_minutes(from),
            end: ClockTime::from_minutes(to),
            offset_timed,
        })
        .collect();

    let end_minutes = spans
        .iter()
        .map(|(_, to)| *to)
        .max()
        .unwrap_or(0)
        .max(start.minutes());
    let setup_offset_minutes = steps
        .iter()
        .zip(spans.iter())
        .find(|(s, _)| s.kind() == ActionKind::Setup)
        .map(|(_, (from, _))| from.saturating_sub(start.minutes()))
        .unwrap_or(0);

    TimelineLayout {
        start,
        steps: steps_out,
        sequential_minutes,
        occupancy_minutes,
        end: ClockTime::from_minutes(end_minutes),
        setup_offset_minutes,
        end_minutes,
    }
}
