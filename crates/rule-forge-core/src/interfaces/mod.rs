// crates/rule-forge-core/src/interfaces/mod.rs
// ============================================================================
// Module: Rule Forge Interfaces
// Description: Backend-agnostic interfaces for oracles, experts, and observers.
// Purpose: Define the contract surfaces used by the refinement runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Rule Forge reaches reasoning oracles without
//! embedding transport or model details. An oracle is a black-box function
//! from structured context to a structured proposal; its internal reasoning
//! is out of scope. Implementations must return well-formed responses or
//! structured errors and must never mutate shared run state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AnalysisSummary;
use crate::core::ExpertFailure;
use crate::core::ExpertiseTag;
use crate::core::Insight;
use crate::core::MalformedRuleError;
use crate::core::RulesetDocument;
use crate::core::RunOutcome;
use crate::core::ValidationResult;

// ============================================================================
// SECTION: Oracle Contexts
// ============================================================================

/// Read-only context handed to experts and the expertise oracle.
///
/// # Invariants
/// - Cloned out per consultation; consumers never observe later mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationContext {
    /// Zero-based iteration index the context describes.
    pub iteration: u32,
    /// Ruleset under evaluation.
    pub ruleset: RulesetDocument,
    /// Validation snapshot for the ruleset.
    pub validation: ValidationResult,
    /// Partitioned failure analysis.
    pub analysis: AnalysisSummary,
}

/// Full context assembled for a refinement proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementContext {
    /// Zero-based iteration index the context describes.
    pub iteration: u32,
    /// Ruleset under evaluation.
    pub ruleset: RulesetDocument,
    /// Validation snapshot for the ruleset.
    pub validation: ValidationResult,
    /// Partitioned failure analysis.
    pub analysis: AnalysisSummary,
    /// Insights gathered from consulted experts, keyed by tag.
    pub insights: BTreeMap<ExpertiseTag, Insight>,
}

// ============================================================================
// SECTION: Proposals
// ============================================================================

/// Structured response from a refinement oracle.
///
/// # Invariants
/// - A refusal is a well-formed answer, not an error; only transport or
///   reasoning failures surface as [`OracleError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Proposal {
    /// Candidate ruleset to be structurally validated and adopted.
    Candidate {
        /// Proposed ruleset document.
        ruleset: RulesetDocument,
    },
    /// Structured refusal to propose this iteration.
    Refusal {
        /// Refusal reason supplied by the oracle.
        reason: String,
    },
}

// ============================================================================
// SECTION: Oracle Errors
// ============================================================================

/// Failures raised by oracle invocations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Call exceeded its configured deadline.
    #[error("oracle call timed out after {timeout_ms} ms")]
    Timeout {
        /// Deadline that was exceeded, in milliseconds.
        timeout_ms: u64,
    },
    /// Transient failure (network or rate-limit class); eligible for retry.
    #[error("transient oracle failure: {0}")]
    Transient(String),
    /// Non-retryable failure.
    #[error("oracle failure: {0}")]
    Fatal(String),
}

impl OracleError {
    /// Returns true when a retry may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transient(_))
    }
}

/// Failures raised by a single expert consultation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpertError {
    /// Expert could not produce an insight.
    #[error("expert consultation failed: {0}")]
    Consultation(String),
}

// ============================================================================
// SECTION: Oracle Traits
// ============================================================================

/// Oracle producing candidate rulesets from refinement context.
pub trait RefinementOracle: Send + Sync {
    /// Requests a refinement proposal for the given context.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the oracle cannot answer.
    fn propose(&self, context: &RefinementContext) -> Result<Proposal, OracleError>;
}

/// Oracle recommending new domains of expertise for the registry.
pub trait ExpertiseOracle: Send + Sync {
    /// Recommends experts for the current run state.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the oracle cannot answer.
    fn recommend(
        &self,
        context: &ConsultationContext,
    ) -> Result<Vec<ExpertRecommendation>, OracleError>;
}

/// Registered, tagged oracle specialized to one domain of analysis.
pub trait Expert: Send + Sync {
    /// Returns the expertise tag the expert is registered under.
    fn expertise(&self) -> &ExpertiseTag;

    /// Produces a domain-scoped insight for the given context.
    ///
    /// # Errors
    ///
    /// Returns [`ExpertError`] when the expert cannot produce an insight.
    fn consult(&self, context: &ConsultationContext) -> Result<Insight, ExpertError>;
}

/// Recommendation pairing a tag with an invocable expert.
#[derive(Clone)]
pub struct ExpertRecommendation {
    /// Tag the expert should be registered under.
    pub tag: ExpertiseTag,
    /// Expert implementation.
    pub expert: Arc<dyn Expert>,
}

impl fmt::Debug for ExpertRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpertRecommendation").field("tag", &self.tag).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// External cancellation signal polled between controller states.
///
/// Cancellation is honored between states, never mid-evaluation, so run
/// state always rests at the last fully committed iteration record.
pub trait CancelSignal {
    /// Returns true when the run should stop at the next state boundary.
    fn is_cancelled(&self) -> bool;
}

/// Cancellation signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl CancelSignal for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

// ============================================================================
// SECTION: Run Observer
// ============================================================================

/// Observer for structured run events.
///
/// The controller emits events without formatting or buffering them; hosts
/// plug in real sinks without new dependencies. All hooks default to no-ops.
pub trait RunObserver {
    /// Called when an iteration begins.
    fn on_iteration_started(&self, _index: u32) {}

    /// Called after each validation pass.
    fn on_validation(&self, _index: u32, _result: &ValidationResult) {}

    /// Called when an expert is registered.
    fn on_expert_registered(&self, _tag: &ExpertiseTag) {}

    /// Called when a duplicate expertise registration is skipped.
    fn on_duplicate_expertise(&self, _tag: &ExpertiseTag) {}

    /// Called for each isolated expert failure.
    fn on_expert_failure(&self, _failure: &ExpertFailure) {}

    /// Called when a structurally invalid candidate is rejected.
    fn on_proposal_rejected(&self, _index: u32, _error: &MalformedRuleError) {}

    /// Called when an oracle call fails after its retry budget.
    fn on_oracle_failure(&self, _index: u32, _error: &OracleError) {}

    /// Called once with the terminal outcome.
    fn on_outcome(&self, _outcome: RunOutcome) {}
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}
