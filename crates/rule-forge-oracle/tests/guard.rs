// crates/rule-forge-oracle/tests/guard.rs
// ============================================================================
// Module: Oracle Guard Tests
// Description: Tests for timeout enforcement and bounded retries.
// ============================================================================

//! ## Overview
//! Validates that the guard retries transient failures, surfaces the last
//! error on exhaustion, enforces deadlines, and never retries fatal errors.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Tests use unwrap on deterministic fixtures."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use rule_forge_core::core::AnalysisSummary;
use rule_forge_core::core::ConfusionCounts;
use rule_forge_core::core::GroupLogic;
use rule_forge_core::core::PartitionSummary;
use rule_forge_core::core::RulesetDocument;
use rule_forge_core::core::ValidationResult;
use rule_forge_core::interfaces::OracleError;
use rule_forge_core::interfaces::Proposal;
use rule_forge_core::interfaces::RefinementContext;
use rule_forge_core::interfaces::RefinementOracle;
use rule_forge_oracle::CallPolicy;
use rule_forge_oracle::GuardedOracle;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds an empty refinement context.
fn context() -> RefinementContext {
    let empty_partition = PartitionSummary {
        record_ids: Vec::new(),
        group_size: 0,
        correct_size: 0,
        fields: Vec::new(),
    };
    RefinementContext {
        iteration: 0,
        ruleset: RulesetDocument::new(GroupLogic::Any, Vec::new()),
        validation: ValidationResult {
            accuracy: 0.5,
            confusion: ConfusionCounts::default(),
            misclassified: Vec::new(),
        },
        analysis: AnalysisSummary {
            false_approves: empty_partition.clone(),
            false_declines: empty_partition,
            near_boundary: Vec::new(),
        },
        insights: std::collections::BTreeMap::new(),
    }
}

/// Oracle failing transiently a fixed number of times before succeeding.
struct FlakyOracle {
    /// Transient failures to serve before the first success.
    failures_before_success: u32,
    /// Number of propose calls observed.
    calls: AtomicU32,
}

impl RefinementOracle for FlakyOracle {
    fn propose(&self, _context: &RefinementContext) -> Result<Proposal, OracleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures_before_success {
            return Err(OracleError::Transient("connection reset".to_string()));
        }
        Ok(Proposal::Refusal {
            reason: "recovered".to_string(),
        })
    }
}

/// Oracle that always fails fatally.
struct BrokenOracle {
    /// Number of propose calls observed.
    calls: AtomicU32,
}

impl RefinementOracle for BrokenOracle {
    fn propose(&self, _context: &RefinementContext) -> Result<Proposal, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OracleError::Fatal("malformed credentials".to_string()))
    }
}

/// Oracle that sleeps past any reasonable test deadline.
struct SleepyOracle;

impl RefinementOracle for SleepyOracle {
    fn propose(&self, _context: &RefinementContext) -> Result<Proposal, OracleError> {
        thread::sleep(Duration::from_secs(5));
        Ok(Proposal::Refusal {
            reason: "too late".to_string(),
        })
    }
}

/// Policy with a generous deadline and the given retry bound.
fn patient_policy(max_retries: u32) -> CallPolicy {
    CallPolicy {
        timeout_ms: 2_000,
        max_retries,
    }
}

// ============================================================================
// SECTION: Retry Behavior
// ============================================================================

#[test]
fn test_transient_failures_are_retried_to_success() {
    let inner = Arc::new(FlakyOracle {
        failures_before_success: 2,
        calls: AtomicU32::new(0),
    });
    let guarded = GuardedOracle::new(Arc::clone(&inner), patient_policy(2));

    let proposal = guarded.propose(&context()).unwrap();
    assert!(matches!(proposal, Proposal::Refusal { reason } if reason == "recovered"));
    assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_retry_exhaustion_surfaces_the_last_error() {
    let inner = Arc::new(FlakyOracle {
        failures_before_success: 10,
        calls: AtomicU32::new(0),
    });
    let guarded = GuardedOracle::new(Arc::clone(&inner), patient_policy(2));

    let error = guarded.propose(&context()).unwrap_err();
    assert!(matches!(error, OracleError::Transient(_)));
    // One initial attempt plus two retries.
    assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_fatal_errors_bypass_the_retry_budget() {
    let inner = Arc::new(BrokenOracle {
        calls: AtomicU32::new(0),
    });
    let guarded = GuardedOracle::new(Arc::clone(&inner), patient_policy(5));

    let error = guarded.propose(&context()).unwrap_err();
    assert!(matches!(error, OracleError::Fatal(_)));
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// SECTION: Deadline Behavior
// ============================================================================

#[test]
fn test_deadline_is_enforced() {
    let guarded = GuardedOracle::new(Arc::new(SleepyOracle), CallPolicy {
        timeout_ms: 100,
        max_retries: 0,
    });

    let error = guarded.propose(&context()).unwrap_err();
    assert_eq!(error, OracleError::Timeout {
        timeout_ms: 100,
    });
}

#[test]
fn test_timeouts_consume_the_retry_budget() {
    let guarded = GuardedOracle::new(Arc::new(SleepyOracle), CallPolicy {
        timeout_ms: 50,
        max_retries: 1,
    });

    let error = guarded.propose(&context()).unwrap_err();
    assert!(matches!(error, OracleError::Timeout { .. }));
}
