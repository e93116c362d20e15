// crates/rule-forge-core/src/core/analysis.rs
// ============================================================================
// Module: Rule Forge Failure Analysis Types
// Description: Partitioned misclassification summaries with frequency deltas.
// Purpose: Hand structured failure evidence to refinement oracles.
// Dependencies: crate::core::{identifiers, record}, serde
// ============================================================================

//! ## Overview
//! Analysis summaries partition misclassified records into false approves and
//! false declines, then compare per-field value frequencies against the
//! correctly classified population on the same side of the decision boundary.
//! Frequencies are fractions of group size rather than raw counts so the
//! evidence stays comparable across dataset sizes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::FieldPath;
use crate::core::identifiers::RecordId;
use crate::core::record::FieldValue;

// ============================================================================
// SECTION: Analyzer Configuration
// ============================================================================

/// Configuration for the misclassification analyzer.
///
/// # Invariants
/// - An empty allowlist (`None`) summarizes every field seen in the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Optional restriction of summarized fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_allowlist: Option<BTreeSet<FieldPath>>,
}

impl AnalyzerConfig {
    /// Returns true when the field participates in summaries.
    #[must_use]
    pub fn includes(&self, field: &FieldPath) -> bool {
        self.field_allowlist.as_ref().is_none_or(|allow| allow.contains(field))
    }
}

// ============================================================================
// SECTION: Frequency Summaries
// ============================================================================

/// Frequency comparison for one field value across a boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDelta {
    /// Observed field value.
    pub value: FieldValue,
    /// Fraction of the misclassified group carrying the value.
    pub misclassified_frequency: f64,
    /// Fraction of the correctly classified group carrying the value.
    pub correct_frequency: f64,
    /// `misclassified_frequency - correct_frequency`.
    pub delta: f64,
}

/// Per-field divergence rows, strongest separation first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDivergence {
    /// Field the rows describe.
    pub field: FieldPath,
    /// Value rows ordered by descending `|delta|`, then value text.
    pub values: Vec<ValueDelta>,
}

/// Summary of one misclassification partition.
///
/// # Invariants
/// - `record_ids` preserves dataset order.
/// - `fields` ordering is deterministic for equal inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    /// Misclassified record identifiers in dataset order.
    pub record_ids: Vec<RecordId>,
    /// Size of the misclassified group.
    pub group_size: usize,
    /// Size of the correctly classified comparison group.
    pub correct_size: usize,
    /// Per-field frequency divergences.
    pub fields: Vec<FieldDivergence>,
}

/// Full analysis output handed to the refinement context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Records predicted approved but actually declined.
    pub false_approves: PartitionSummary,
    /// Records predicted declined but actually approved.
    pub false_declines: PartitionSummary,
    /// Records whose outcome hinges on a single top-level rule, in dataset
    /// order. These sit closest to the decision boundary and are the first
    /// candidates for threshold adjustments.
    pub near_boundary: Vec<RecordId>,
}
