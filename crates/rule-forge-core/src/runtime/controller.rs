// crates/rule-forge-core/src/runtime/controller.rs
// ============================================================================
// Module: Rule Forge Refinement Controller
// Description: Iterative validate/analyze/consult/propose/adopt state machine.
// Purpose: Drive ruleset discovery to convergence within a bounded budget.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The controller owns the refinement loop and is the single canonical
//! execution path for a discovery run. Each iteration is strictly sequential:
//! validation completes before analysis, analysis before consultation,
//! consultation before the refinement proposal. Oracles are invoked through
//! their trait surfaces only; callers wanting timeouts and retries wrap the
//! oracle (see the guard in the oracle crate) rather than changing the loop.
//! Every run terminates within `max_iterations + 1` validation passes
//! regardless of oracle behavior, and always reports the best ruleset seen.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AnalyzerConfig;
use crate::core::BestRuleset;
use crate::core::ConsultationOutcome;
use crate::core::ExpertiseTag;
use crate::core::IterationRecord;
use crate::core::MalformedRuleError;
use crate::core::ProposalOutcome;
use crate::core::Record;
use crate::core::RulesetDocument;
use crate::core::RunOutcome;
use crate::core::RunReport;
use crate::core::RunState;
use crate::core::ValidationResult;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::interfaces::CancelSignal;
use crate::interfaces::ConsultationContext;
use crate::interfaces::ExpertiseOracle;
use crate::interfaces::NeverCancelled;
use crate::interfaces::NoopObserver;
use crate::interfaces::Proposal;
use crate::interfaces::RefinementContext;
use crate::interfaces::RefinementOracle;
use crate::interfaces::RunObserver;
use crate::runtime::analyzer::analyze;
use crate::runtime::registry::ExpertRegistry;
use crate::runtime::validator::ValidateError;
use crate::runtime::validator::validate;

// ============================================================================
// SECTION: Controller Configuration
// ============================================================================

/// Policy applied when a refinement-oracle call fails after its retry budget.
///
/// # Invariants
/// - Variants are stable for serialization and config matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleFailurePolicy {
    /// Record the failed iteration and continue toward the budget.
    ContinueRun,
    /// Record the failed iteration and stop at `BudgetExhausted`.
    AbortRun,
}

/// Configuration for one discovery run.
///
/// # Invariants
/// - `max_iterations >= 1`; `success_threshold` lies in `(0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Maximum number of refinement iterations before the budget is spent.
    pub max_iterations: u32,
    /// Accuracy at or above which the run converges.
    pub success_threshold: f64,
    /// Field restriction applied by the misclassification analyzer.
    pub analyzer: AnalyzerConfig,
    /// Deadline for one expert consultation round, in milliseconds.
    pub consultation_timeout_ms: u64,
    /// Policy applied when the refinement oracle fails.
    pub on_oracle_failure: OracleFailurePolicy,
}

impl ControllerConfig {
    /// Validates configuration bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError`] when a bound is violated.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.max_iterations == 0 {
            return Err(ControllerError::InvalidMaxIterations);
        }
        if !(self.success_threshold > 0.0 && self.success_threshold <= 1.0) {
            return Err(ControllerError::InvalidSuccessThreshold {
                value: self.success_threshold,
            });
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            success_threshold: 1.0,
            analyzer: AnalyzerConfig::default(),
            consultation_timeout_ms: 30_000,
            on_oracle_failure: OracleFailurePolicy::ContinueRun,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal errors raised by the controller.
///
/// Recoverable conditions (malformed candidates, oracle failures, duplicate
/// expertise) are absorbed into the iteration log instead of surfacing here.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// `max_iterations` must be at least one.
    #[error("max_iterations must be at least 1")]
    InvalidMaxIterations,
    /// `success_threshold` must lie in `(0, 1]`.
    #[error("success_threshold must lie in (0, 1], got {value}")]
    InvalidSuccessThreshold {
        /// Rejected threshold value.
        value: f64,
    },
    /// Caller-supplied seed ruleset failed structural validation.
    #[error("seed ruleset is malformed: {0}")]
    MalformedSeed(#[source] MalformedRuleError),
    /// Dataset validation failed.
    #[error(transparent)]
    Validate(#[from] ValidateError),
    /// Canonical hashing of a ruleset snapshot failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Refinement Controller
// ============================================================================

/// Controller driving the refinement loop for discovery runs.
///
/// # Invariants
/// - Run state is owned exclusively by the controller for the duration of a
///   run; each run starts from fresh state and a fresh expert registry.
/// - Committed iteration records are never rewritten.
pub struct RefinementController<R, E> {
    /// Oracle producing candidate rulesets.
    refiner: R,
    /// Oracle recommending new expertise.
    expertise: E,
    /// Run configuration.
    config: ControllerConfig,
    /// Observer for structured run events.
    observer: Box<dyn RunObserver>,
    /// External cancellation signal, polled between states.
    cancel: Box<dyn CancelSignal>,
}

impl<R, E> std::fmt::Debug for RefinementController<R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefinementController")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<R, E> RefinementController<R, E>
where
    R: RefinementOracle,
    E: ExpertiseOracle,
{
    /// Creates a controller with the given oracles and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError`] when the configuration is out of bounds.
    pub fn new(refiner: R, expertise: E, config: ControllerConfig) -> Result<Self, ControllerError> {
        config.validate()?;
        Ok(Self {
            refiner,
            expertise,
            config,
            observer: Box::new(NoopObserver),
            cancel: Box::new(NeverCancelled),
        })
    }

    /// Replaces the run observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the cancellation signal.
    #[must_use]
    pub fn with_cancel_signal(mut self, cancel: Box<dyn CancelSignal>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Executes one discovery run over the dataset.
    ///
    /// The seed ruleset is the caller's tree when supplied, otherwise the
    /// always-decline posture. The returned report carries the best ruleset
    /// observed and the full iteration history, even when later iterations
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError`] for fatal conditions only: a malformed
    /// seed, a dataset with no labeled records, or a hashing failure.
    #[allow(
        clippy::too_many_lines,
        reason = "Maintain a single linear flow for ordered state transitions and auditability."
    )]
    pub fn run(
        &self,
        seed: Option<RulesetDocument>,
        dataset: &[Record],
    ) -> Result<RunReport, ControllerError> {
        let seed = seed.unwrap_or_else(RulesetDocument::always_decline);
        seed.validate().map_err(ControllerError::MalformedSeed)?;

        let mut state = RunState::new(seed);
        let mut registry = ExpertRegistry::new();
        let consultation_timeout = Duration::from_millis(self.config.consultation_timeout_ms);

        let outcome = loop {
            let index = u32::try_from(state.iterations.len()).unwrap_or(u32::MAX);
            if self.cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }
            self.observer.on_iteration_started(index);

            // State: Validating.
            let validation = validate(&state.current, dataset)?;
            self.observer.on_validation(index, &validation);
            let ruleset_hash = snapshot_hash(&state.current)?;

            if validation.accuracy >= self.config.success_threshold {
                let record = terminal_record(index, &state.current, ruleset_hash, validation);
                commit(&mut state, record);
                break RunOutcome::Converged;
            }
            if index >= self.config.max_iterations {
                let record = terminal_record(index, &state.current, ruleset_hash, validation);
                commit(&mut state, record);
                break RunOutcome::BudgetExhausted;
            }

            if self.cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }

            // State: AnalyzingFailures. The only state that grows the registry.
            let analysis = analyze(&state.current, dataset, &validation, &self.config.analyzer);
            let consultation_context = ConsultationContext {
                iteration: index,
                ruleset: state.current.clone(),
                validation: validation.clone(),
                analysis: analysis.clone(),
            };
            if index >= 1 && registry.is_empty() {
                self.recommend_experts(index, &consultation_context, &mut registry);
            }

            if self.cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }

            // State: ConsultingExperts.
            let consultation = if registry.is_empty() {
                ConsultationOutcome::default()
            } else {
                let tags: Vec<ExpertiseTag> = registry.tags().into_iter().collect();
                registry.consult(&tags, &consultation_context, consultation_timeout)
            };
            for failure in &consultation.failures {
                self.observer.on_expert_failure(failure);
            }

            if self.cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }

            // State: ProposingRefinement.
            let insights: BTreeMap<ExpertiseTag, _> = consultation.insights.clone();
            let refinement_context = RefinementContext {
                iteration: index,
                ruleset: state.current.clone(),
                validation: validation.clone(),
                analysis,
                insights,
            };
            let proposal = self.refiner.propose(&refinement_context);

            // State: Adopting.
            let consulted: Vec<ExpertiseTag> = consultation.insights.keys().cloned().collect();
            let mut record = IterationRecord {
                index,
                ruleset: state.current.clone(),
                ruleset_hash,
                validation,
                insights: consulted,
                expert_failures: consultation.failures,
                proposal: ProposalOutcome::NotRequested,
                accepted: false,
            };

            let mut abort_after_commit = false;
            match proposal {
                Ok(Proposal::Candidate {
                    ruleset,
                }) => match ruleset.validate() {
                    Ok(()) => {
                        record.proposal = ProposalOutcome::Adopted;
                        record.accepted = true;
                        state.current = ruleset;
                    }
                    Err(defect) => {
                        self.observer.on_proposal_rejected(index, &defect);
                        record.proposal = ProposalOutcome::RejectedMalformed {
                            reason: defect.to_string(),
                        };
                    }
                },
                Ok(Proposal::Refusal {
                    reason,
                }) => {
                    record.proposal = ProposalOutcome::Refused {
                        reason,
                    };
                }
                Err(error) => {
                    self.observer.on_oracle_failure(index, &error);
                    record.proposal = ProposalOutcome::OracleFailed {
                        reason: error.to_string(),
                    };
                    abort_after_commit =
                        self.config.on_oracle_failure == OracleFailurePolicy::AbortRun;
                }
            }

            commit(&mut state, record);
            if abort_after_commit {
                break RunOutcome::BudgetExhausted;
            }
        };

        self.observer.on_outcome(outcome);
        Ok(RunReport {
            outcome,
            best: state.best,
            iterations: state.iterations,
        })
    }

    /// Requests expertise recommendations and registers the results.
    ///
    /// Duplicate tags are skipped with a warning event; an oracle failure
    /// here is non-fatal and simply leaves the registry unchanged.
    fn recommend_experts(
        &self,
        index: u32,
        context: &ConsultationContext,
        registry: &mut ExpertRegistry,
    ) {
        match self.expertise.recommend(context) {
            Ok(recommendations) => {
                for recommendation in recommendations {
                    match registry.register(recommendation.tag.clone(), recommendation.expert) {
                        Ok(()) => self.observer.on_expert_registered(&recommendation.tag),
                        Err(_) => self.observer.on_duplicate_expertise(&recommendation.tag),
                    }
                }
            }
            Err(error) => self.observer.on_oracle_failure(index, &error),
        }
    }
}

// ============================================================================
// SECTION: Loop Helpers
// ============================================================================

/// Computes the canonical hash for a ruleset snapshot.
fn snapshot_hash(ruleset: &RulesetDocument) -> Result<HashDigest, HashError> {
    hash_canonical_json(DEFAULT_HASH_ALGORITHM, ruleset)
}

/// Commits one iteration record, folding it into best-so-far atomically.
///
/// Cancellation between states can therefore never observe a best snapshot
/// ahead of the committed history. Best-so-far updates only on strictly
/// greater accuracy; ties keep the earlier snapshot, so equal-accuracy churn
/// never replaces an established best.
fn commit(state: &mut RunState, record: IterationRecord) {
    let improved =
        state.best.as_ref().is_none_or(|best| record.validation.accuracy > best.accuracy);
    if improved {
        state.best = Some(BestRuleset {
            ruleset: record.ruleset.clone(),
            ruleset_hash: record.ruleset_hash.clone(),
            accuracy: record.validation.accuracy,
            iteration: record.index,
        });
    }
    state.iterations.push(record);
}

/// Builds the log record for a terminal (converged or exhausted) iteration.
fn terminal_record(
    index: u32,
    ruleset: &RulesetDocument,
    ruleset_hash: HashDigest,
    validation: ValidationResult,
) -> IterationRecord {
    IterationRecord {
        index,
        ruleset: ruleset.clone(),
        ruleset_hash,
        validation,
        insights: Vec::new(),
        expert_failures: Vec::new(),
        proposal: ProposalOutcome::NotRequested,
        accepted: false,
    }
}
