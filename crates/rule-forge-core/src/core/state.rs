// crates/rule-forge-core/src/core/state.rs
// ============================================================================
// Module: Rule Forge Run State
// Description: Validation snapshots, iteration logs, and run reports.
// Purpose: Capture deterministic run evolution for replay and reporting.
// Dependencies: crate::core::{hashing, identifiers, insight, ruleset}, serde
// ============================================================================

//! ## Overview
//! Run state captures the full refinement history for one discovery session.
//! Iteration records are append-only; ruleset snapshots are immutable and
//! carry canonical hashes, which makes rollback to any prior iteration a
//! lookup rather than a reconstruction. A run always ends with a report that
//! names the best ruleset seen, even when later iterations failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::ExpertiseTag;
use crate::core::identifiers::RecordId;
use crate::core::insight::ExpertFailure;
use crate::core::ruleset::RulesetDocument;

// ============================================================================
// SECTION: Confusion Counts
// ============================================================================

/// Confusion-matrix counts for one validation pass.
///
/// # Invariants
/// - `accuracy == (tp + tn) / total()` exactly, for any dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionCounts {
    /// Records correctly predicted as approved.
    pub true_positive: usize,
    /// Records correctly predicted as declined.
    pub true_negative: usize,
    /// Records wrongly predicted as approved.
    pub false_positive: usize,
    /// Records wrongly predicted as declined.
    pub false_negative: usize,
}

impl ConfusionCounts {
    /// Returns the number of correctly classified records.
    #[must_use]
    pub const fn correct(&self) -> usize {
        self.true_positive + self.true_negative
    }

    /// Returns the total number of classified records.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }
}

// ============================================================================
// SECTION: Validation Results
// ============================================================================

/// One misclassified record with both labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misclassification {
    /// Identifier of the misclassified record.
    pub record_id: RecordId,
    /// Label the ruleset predicted.
    pub predicted: bool,
    /// Ground-truth label.
    pub actual: bool,
}

/// Immutable snapshot of one validation pass.
///
/// # Invariants
/// - `misclassified` preserves dataset iteration order.
/// - Two passes over equal inputs produce byte-for-byte equal snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Fraction of records classified correctly, in `[0, 1]`.
    pub accuracy: f64,
    /// Confusion-matrix counts.
    pub confusion: ConfusionCounts,
    /// Misclassified records in dataset order.
    pub misclassified: Vec<Misclassification>,
}

// ============================================================================
// SECTION: Iteration Records
// ============================================================================

/// Outcome of the proposal step within one iteration.
///
/// # Invariants
/// - Variants are stable for serialization and artifact matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalOutcome {
    /// Candidate was structurally valid and became current.
    Adopted,
    /// Candidate was structurally invalid and the previous ruleset was kept.
    RejectedMalformed {
        /// Structural defect description.
        reason: String,
    },
    /// Oracle returned a structured refusal; the previous ruleset was kept.
    Refused {
        /// Refusal reason supplied by the oracle.
        reason: String,
    },
    /// Oracle call failed after the retry budget; the previous ruleset was kept.
    OracleFailed {
        /// Failure description.
        reason: String,
    },
    /// No proposal was requested (terminal iterations).
    NotRequested,
}

/// Append-only log entry for one pass of the refinement loop.
///
/// # Invariants
/// - `index` is dense and strictly increasing within a run, starting at 0.
/// - `ruleset_hash` is the canonical hash of `ruleset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based iteration index.
    pub index: u32,
    /// Ruleset snapshot validated this iteration.
    pub ruleset: RulesetDocument,
    /// Canonical hash of the ruleset snapshot.
    pub ruleset_hash: HashDigest,
    /// Validation snapshot for the ruleset.
    pub validation: ValidationResult,
    /// Tags whose insights informed the refinement context.
    pub insights: Vec<ExpertiseTag>,
    /// Isolated expert failures observed during consultation.
    pub expert_failures: Vec<ExpertFailure>,
    /// Outcome of the proposal step.
    pub proposal: ProposalOutcome,
    /// Whether a new ruleset was adopted this iteration.
    pub accepted: bool,
}

// ============================================================================
// SECTION: Best-So-Far Tracking
// ============================================================================

/// Highest-accuracy ruleset observed across a run.
///
/// # Invariants
/// - Accuracy never decreases across updates; ties keep the earlier snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestRuleset {
    /// Best ruleset snapshot.
    pub ruleset: RulesetDocument,
    /// Canonical hash of the best snapshot.
    pub ruleset_hash: HashDigest,
    /// Accuracy the snapshot achieved.
    pub accuracy: f64,
    /// Iteration index that produced the snapshot.
    pub iteration: u32,
}

// ============================================================================
// SECTION: Run State and Reports
// ============================================================================

/// Terminal outcome of a discovery run.
///
/// # Invariants
/// - Variants are stable for serialization and exit-status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Accuracy reached the configured success threshold.
    Converged,
    /// The iteration budget was exhausted before convergence.
    BudgetExhausted,
    /// An external cancellation signal stopped the run between states.
    Cancelled,
}

/// Mutable state owned exclusively by the controller for one run.
///
/// # Invariants
/// - `iterations` is append-only; committed records are never rewritten.
/// - No state crosses run boundaries; each run starts fresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Ruleset currently under evaluation.
    pub current: RulesetDocument,
    /// Append-only iteration history.
    pub iterations: Vec<IterationRecord>,
    /// Best-so-far snapshot, once the first validation has run.
    pub best: Option<BestRuleset>,
}

impl RunState {
    /// Creates fresh run state seeded with the given ruleset.
    #[must_use]
    pub const fn new(seed: RulesetDocument) -> Self {
        Self {
            current: seed,
            iterations: Vec::new(),
            best: None,
        }
    }
}

/// Final report returned by the controller.
///
/// # Invariants
/// - Present even on partial failure: committed history is never lost.
/// - `best` is `None` only when cancellation fired before the first
///   validation pass committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Terminal outcome of the run.
    pub outcome: RunOutcome,
    /// Best ruleset observed across all iterations.
    pub best: Option<BestRuleset>,
    /// Full iteration history in order.
    pub iterations: Vec<IterationRecord>,
}
