// crates/rule-forge-core/src/core/insight.rs
// ============================================================================
// Module: Rule Forge Expert Insights
// Description: Structured hints produced by expert consultation.
// Purpose: Carry domain-scoped suggestions into refinement context.
// Dependencies: crate::core::{identifiers, record}, serde
// ============================================================================

//! ## Overview
//! An insight is a structured hint (a suggested field, a suggested value,
//! and rationale text), never a rule tree. The refinement oracle decides how
//! to fold insights into a candidate; the core only transports them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ExpertiseTag;
use crate::core::identifiers::FieldPath;
use crate::core::record::FieldValue;

// ============================================================================
// SECTION: Insights
// ============================================================================

/// Structured hint produced by one expert consultation.
///
/// # Invariants
/// - Insights are hints, never rule trees; adoption decisions stay with the
///   refinement oracle and the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Field the expert suggests acting on, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_field: Option<FieldPath>,
    /// Value or threshold the expert suggests, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<FieldValue>,
    /// Free-form rationale text.
    pub rationale: String,
}

// ============================================================================
// SECTION: Consultation Outcomes
// ============================================================================

/// Failure record for one isolated expert consultation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertFailure {
    /// Tag of the expert that failed.
    pub tag: ExpertiseTag,
    /// Failure description.
    pub reason: String,
}

/// Aggregate result of consulting a set of experts.
///
/// # Invariants
/// - A tag appears in `insights` or `failures`, never both.
/// - Failures never abort the consultation of other experts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsultationOutcome {
    /// Insights keyed by expertise tag.
    pub insights: BTreeMap<ExpertiseTag, Insight>,
    /// Isolated failures, in consultation order.
    pub failures: Vec<ExpertFailure>,
}
