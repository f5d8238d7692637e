// ==========================================
// Day Treatment Planner - Core library
// ==========================================
// Clinic day-treatment planning engine:
// protocol expansion, setup capacity, staff assignment,
// day rebalancing, workload analytics
// ==========================================
// Positioning: decision support. The engine computes start times and
// timelines; persisting them stays with the caller.
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain layer - entities and value types
pub mod domain;

// Engine layer - planning rules
pub mod engine;

// Config layer - clinic constants
pub mod config;

// Logging
pub mod logging;

// ==========================================
// Re-exports
// ==========================================

// Domain types
pub use domain::{
    Action, ActionKind, ActionTemplate, ClockTime, Patient, ProtocolVariant, StaffMember,
    TimeSlot, TimeWindow,
};

// Config
pub use config::{ClinicConfig, ConfigError};

// Engines
pub use engine::{
    plan_request, DayPlan, DayPlanner, DayPlanningOptimizer, DayRequest, EngineError,
    EngineResult, OptimizationResult, ProtocolExpander, ProtocolLookup, SetupCapacityTracker,
    StaffAssignment, StaffScheduler, WorkloadAnalytics,
};

// ==========================================
// Constants
// ==========================================

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Display name
pub const APP_NAME: &str = "Day Treatment Planner";
