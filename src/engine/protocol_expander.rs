// ==========================================
// Day Treatment Planner - Protocol Expander
// ==========================================
// Input: medication id + treatment number
// Output: ordered action templates
// ==========================================
// Pure lookup. An unknown combination is ProtocolNotFound, never an
// empty or invented timeline.
// ==========================================

use crate::domain::protocol::{ActionTemplate, ProtocolVariant};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::BTreeMap;

// ==========================================
// Trait: ProtocolLookup
// ==========================================
// Seam through which the optimizer and day planner read reference data
pub trait ProtocolLookup {
    fn expand(&self, protocol_id: &str, treatment_number: u32) -> EngineResult<Vec<ActionTemplate>>;
}

// ==========================================
// ProtocolExpander - validated in-memory catalog
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ProtocolExpander {
    variants: BTreeMap<(String, u32), ProtocolVariant>,
}

impl ProtocolExpander {
    /// Build from reference data, rejecting invalid or duplicate variants.
    pub fn new(variants: Vec<ProtocolVariant>) -> EngineResult<Self> {
        let mut map = BTreeMap::new();
        for variant in variants {
            validate_variant(&variant)?;
            let key = (variant.medication_id.clone(), variant.treatment_number);
            if map.contains_key(&key) {
                return Err(EngineError::DuplicateProtocol {
                    protocol_id: key.0,
                    treatment_number: key.1,
                });
            }
            map.insert(key, variant);
        }
        Ok(Self { variants: map })
    }

    /// Load a JSON array of variants.
    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        let variants: Vec<ProtocolVariant> = serde_json::from_str(raw)?;
        Self::new(variants)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Resolve the variant serving this treatment number.
    ///
    /// Exact match first; otherwise the highest lower-numbered variant of
    /// the same medication flagged `applies_to_later_treatments`.
    pub fn variant(&self, protocol_id: &str, treatment_number: u32) -> Option<&ProtocolVariant> {
        let exact_key = (protocol_id.to_string(), treatment_number);
        if let Some(v) = self.variants.get(&exact_key) {
            return Some(v);
        }

        self.variants
            .range((protocol_id.to_string(), 0)..exact_key)
            .rev()
            .map(|(_, v)| v)
            .find(|v| v.applies_to_later_treatments)
    }
}

impl ProtocolLookup for ProtocolExpander {
    fn expand(&self, protocol_id: &str, treatment_number: u32) -> EngineResult<Vec<ActionTemplate>> {
        self.variant(protocol_id, treatment_number)
            .map(|v| v.actions.clone())
            .ok_or_else(|| EngineError::ProtocolNotFound {
                protocol_id: protocol_id.to_string(),
                treatment_number,
            })
    }
}

fn validate_variant(variant: &ProtocolVariant) -> EngineResult<()> {
    let invalid = |reason: String| EngineError::InvalidProtocol {
        protocol_id: variant.medication_id.clone(),
        treatment_number: variant.treatment_number,
        reason,
    };

    if variant.actions.is_empty() {
        return Err(invalid("variant has no actions".to_string()));
    }

    for template in &variant.actions {
        if template.check_offset_minutes.is_some() && !template.kind.uses_check_offset() {
            return Err(invalid(format!(
                "action '{}' of kind {} cannot carry a check offset",
                template.name, template.kind
            )));
        }
    }

    let has_offset_checks = variant.actions.iter().any(|t| t.is_offset_timed());
    if has_offset_checks && !variant.has_infusion() {
        return Err(invalid("offset-timed checks without an infusion".to_string()));
    }

    Ok(())
}
