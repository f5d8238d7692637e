// ==========================================
// Day Treatment Planner - Config layer
// ==========================================
// Clinic constants lifted out of the engine so tests and deployments
// can vary them without recompiling.
// ==========================================

pub mod clinic_config;
pub mod error;

pub use clinic_config::{config_keys, ClinicConfig};
pub use error::{ConfigError, ConfigResult};
