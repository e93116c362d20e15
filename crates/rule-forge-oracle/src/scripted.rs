// crates/rule-forge-oracle/src/scripted.rs
// ============================================================================
// Module: Scripted Oracles and Built-in Experts
// Description: Deterministic oracle implementations for replay and testing.
// Purpose: Drive discovery runs without a live reasoning engine.
// Dependencies: rule-forge-core, serde_json
// ============================================================================

//! ## Overview
//! Scripted oracles serve fixed proposal and recommendation sequences, which
//! makes runs replayable: the same dataset and script always produce the same
//! history. They are the substitution point the interfaces were designed
//! for: a live reasoning engine implements the same traits. The built-in experts
//! produce insights from the analysis summary alone, with no external calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rule_forge_core::core::AnalysisSummary;
use rule_forge_core::core::ExpertiseTag;
use rule_forge_core::core::FieldPath;
use rule_forge_core::core::Insight;
use rule_forge_core::core::PartitionSummary;
use rule_forge_core::core::ValueDelta;
use rule_forge_core::interfaces::ConsultationContext;
use rule_forge_core::interfaces::Expert;
use rule_forge_core::interfaces::ExpertError;
use rule_forge_core::interfaces::ExpertRecommendation;
use rule_forge_core::interfaces::ExpertiseOracle;
use rule_forge_core::interfaces::OracleError;
use rule_forge_core::interfaces::Proposal;
use rule_forge_core::interfaces::RefinementContext;
use rule_forge_core::interfaces::RefinementOracle;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Script Loading
// ============================================================================

/// Errors raised while loading a proposal script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Script JSON failed to parse.
    #[error("failed to parse proposal script: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Scripted Refinement Oracle
// ============================================================================

/// Behavior once a proposal script is exhausted.
///
/// # Invariants
/// - Variants are stable for serialization and config matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedBehavior {
    /// Keep serving the final script entry.
    RepeatLast,
    /// Refuse every request past the script's end.
    Refuse,
}

/// Refinement oracle serving a fixed proposal sequence.
///
/// # Invariants
/// - Proposals are served in script order, one per call.
/// - An empty script refuses every request.
#[derive(Debug)]
pub struct ScriptedRefinementOracle {
    /// Proposal sequence in serving order.
    proposals: Vec<Proposal>,
    /// Index of the next proposal to serve.
    cursor: Mutex<usize>,
    /// Behavior once the script is exhausted.
    exhausted: ExhaustedBehavior,
}

impl ScriptedRefinementOracle {
    /// Creates a scripted oracle from a proposal sequence.
    #[must_use]
    pub const fn new(proposals: Vec<Proposal>, exhausted: ExhaustedBehavior) -> Self {
        Self {
            proposals,
            cursor: Mutex::new(0),
            exhausted,
        }
    }

    /// Parses a proposal script from JSON bytes (an array of proposals).
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Parse`] when the JSON does not match the
    /// proposal shape.
    pub fn from_json_slice(
        bytes: &[u8],
        exhausted: ExhaustedBehavior,
    ) -> Result<Self, ScriptError> {
        let proposals: Vec<Proposal> =
            serde_json::from_slice(bytes).map_err(|err| ScriptError::Parse(err.to_string()))?;
        Ok(Self::new(proposals, exhausted))
    }
}

impl RefinementOracle for ScriptedRefinementOracle {
    fn propose(&self, _context: &RefinementContext) -> Result<Proposal, OracleError> {
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| OracleError::Fatal("proposal script cursor poisoned".to_string()))?;

        if let Some(proposal) = self.proposals.get(*cursor) {
            *cursor += 1;
            return Ok(proposal.clone());
        }

        match self.exhausted {
            ExhaustedBehavior::RepeatLast => self.proposals.last().cloned().map_or_else(
                || {
                    Ok(Proposal::Refusal {
                        reason: "proposal script is empty".to_string(),
                    })
                },
                Ok,
            ),
            ExhaustedBehavior::Refuse => Ok(Proposal::Refusal {
                reason: "proposal script exhausted".to_string(),
            }),
        }
    }
}

// ============================================================================
// SECTION: Scripted Expertise Oracle
// ============================================================================

/// Expertise oracle serving a fixed recommendation list once.
///
/// Subsequent calls return an empty list, mirroring an advisor with nothing
/// further to add.
pub struct ScriptedExpertiseOracle {
    /// Recommendations served on the first call.
    recommendations: Vec<ExpertRecommendation>,
    /// Whether the list has been served.
    served: Mutex<bool>,
}

impl ScriptedExpertiseOracle {
    /// Creates a scripted expertise oracle.
    #[must_use]
    pub const fn new(recommendations: Vec<ExpertRecommendation>) -> Self {
        Self {
            recommendations,
            served: Mutex::new(false),
        }
    }

    /// Creates an oracle that never recommends anyone.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl ExpertiseOracle for ScriptedExpertiseOracle {
    fn recommend(
        &self,
        _context: &ConsultationContext,
    ) -> Result<Vec<ExpertRecommendation>, OracleError> {
        let mut served = self
            .served
            .lock()
            .map_err(|_| OracleError::Fatal("recommendation state poisoned".to_string()))?;
        if *served {
            return Ok(Vec::new());
        }
        *served = true;
        Ok(self.recommendations.clone())
    }
}

// ============================================================================
// SECTION: Built-in Experts
// ============================================================================

/// Expert returning one fixed insight.
#[derive(Debug, Clone)]
pub struct StaticExpert {
    /// Tag the expert registers under.
    tag: ExpertiseTag,
    /// Insight served on every consultation.
    insight: Insight,
}

impl StaticExpert {
    /// Creates a static expert.
    #[must_use]
    pub const fn new(tag: ExpertiseTag, insight: Insight) -> Self {
        Self {
            tag,
            insight,
        }
    }

    /// Wraps the expert in a recommendation for registration.
    #[must_use]
    pub fn recommendation(self) -> ExpertRecommendation {
        ExpertRecommendation {
            tag: self.tag.clone(),
            expert: Arc::new(self),
        }
    }
}

impl Expert for StaticExpert {
    fn expertise(&self) -> &ExpertiseTag {
        &self.tag
    }

    fn consult(&self, _context: &ConsultationContext) -> Result<Insight, ExpertError> {
        Ok(self.insight.clone())
    }
}

/// Expert surfacing the strongest frequency divergence for one field.
///
/// # Invariants
/// - Reads only the analysis summary; never touches the dataset or oracles.
#[derive(Debug, Clone)]
pub struct DivergenceExpert {
    /// Tag the expert registers under.
    tag: ExpertiseTag,
    /// Field whose divergence rows the expert reads.
    field: FieldPath,
}

impl DivergenceExpert {
    /// Creates a divergence expert for the given field.
    #[must_use]
    pub const fn new(tag: ExpertiseTag, field: FieldPath) -> Self {
        Self {
            tag,
            field,
        }
    }

    /// Wraps the expert in a recommendation for registration.
    #[must_use]
    pub fn recommendation(self) -> ExpertRecommendation {
        ExpertRecommendation {
            tag: self.tag.clone(),
            expert: Arc::new(self),
        }
    }

    /// Returns the strongest divergence row for the field in one partition.
    fn strongest<'summary>(
        &self,
        partition: &'summary PartitionSummary,
    ) -> Option<&'summary ValueDelta> {
        partition
            .fields
            .iter()
            .find(|divergence| divergence.field == self.field)
            .and_then(|divergence| divergence.values.first())
    }
}

impl Expert for DivergenceExpert {
    fn expertise(&self) -> &ExpertiseTag {
        &self.tag
    }

    fn consult(&self, context: &ConsultationContext) -> Result<Insight, ExpertError> {
        let analysis: &AnalysisSummary = &context.analysis;
        let candidates = [
            ("false approves", self.strongest(&analysis.false_approves)),
            ("false declines", self.strongest(&analysis.false_declines)),
        ];

        let (partition, row) = candidates
            .into_iter()
            .filter_map(|(name, row)| row.map(|row| (name, row)))
            .max_by(|(_, lhs), (_, rhs)| {
                lhs.delta
                    .abs()
                    .partial_cmp(&rhs.delta.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or_else(|| {
                ExpertError::Consultation(format!(
                    "field `{}` does not appear in the analysis summary",
                    self.field
                ))
            })?;

        Ok(Insight {
            suggested_field: Some(self.field.clone()),
            suggested_value: Some(row.value.clone()),
            rationale: format!(
                "value `{}` over-represents the {partition} group (delta {:+.3})",
                row.value, row.delta
            ),
        })
    }
}
