// ==========================================
// Day Treatment Planner - Domain layer
// ==========================================
// Entities and value types.
// No engine logic here.
// ==========================================

pub mod patient;
pub mod protocol;
pub mod slot;
pub mod staff;
pub mod types;

pub use patient::{Action, Patient};
pub use protocol::{ActionTemplate, ProtocolVariant};
pub use slot::TimeSlot;
pub use staff::StaffMember;
pub use types::{ActionKind, ClockTime, ParseClockTimeError, TimeWindow};
