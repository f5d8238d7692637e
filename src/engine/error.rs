// ==========================================
// Day Treatment Planner - Engine errors
// ==========================================
// Tool: thiserror derive
// Missing staff and unmovable patients are results, not errors.
// ==========================================

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // ===== Protocol reference data =====
    #[error("protocol not found: protocol_id={protocol_id}, treatment_number={treatment_number}")]
    ProtocolNotFound {
        protocol_id: String,
        treatment_number: u32,
    },

    #[error("protocol invalid: protocol_id={protocol_id}, treatment_number={treatment_number}: {reason}")]
    InvalidProtocol {
        protocol_id: String,
        treatment_number: u32,
        reason: String,
    },

    #[error("duplicate protocol variant: protocol_id={protocol_id}, treatment_number={treatment_number}")]
    DuplicateProtocol {
        protocol_id: String,
        treatment_number: u32,
    },

    // ===== Input =====
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("reference data parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
