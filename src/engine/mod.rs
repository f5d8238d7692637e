// ==========================================
// Day Treatment Planner - Engine layer
// ==========================================
// Leaves first:
//   protocol_expander -> setup_capacity -> staff_scheduler
//   -> day_optimizer -> day_planner
// analytics stands alone (read-only)
// ==========================================
// Red line: engines compute instructions, they never persist
// ==========================================

pub mod analytics;
pub mod day_optimizer;
pub mod day_planner;
pub mod error;
pub mod protocol_expander;
pub mod setup_capacity;
pub mod staff_scheduler;
pub mod timeline;

// Re-export core engines
pub use analytics::WorkloadAnalytics;
pub use day_optimizer::{congestion_score, DayPlanningOptimizer, OptimizationResult};
pub use day_planner::{
    plan_request, DayPlan, DayPlanner, DayRequest, TimelineReplacement, UnassignedAction,
};
pub use error::{EngineError, EngineResult};
pub use protocol_expander::{ProtocolExpander, ProtocolLookup};
pub use setup_capacity::{SetupCapacity, SetupCapacityTracker};
pub use staff_scheduler::{
    AssignmentRecord, DayRoster, SelectionKey, StaffAssignment, StaffLoad, StaffScheduler,
};
pub use timeline::{lay_out, StepTiming, TimedStep, TimelineLayout};
