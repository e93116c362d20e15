// crates/rule-forge-core/tests/validator.rs
// ============================================================================
// Module: Validator Tests
// Description: Tests for dataset-wide accuracy and confusion measurement.
// ============================================================================

//! ## Overview
//! Validates the accuracy identity, misclassification ordering, and the
//! empty-dataset failure mode.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Tests use unwrap and exact float comparison on deterministic fixtures."
)]

use rule_forge_core::core::GroupLogic;
use rule_forge_core::core::Record;
use rule_forge_core::core::RecordId;
use rule_forge_core::core::RuleNode;
use rule_forge_core::core::RulesetDocument;
use rule_forge_core::runtime::ValidateError;
use rule_forge_core::runtime::validate;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds a labeled record with one numeric score field.
fn scored(id: &str, score: i64, approved: Option<bool>) -> Record {
    Record::from_json(
        RecordId::new(id),
        &json!({ "creditHistory": { "creditScore": score } }),
        approved,
    )
}

/// Ruleset approving scores strictly above 700.
fn score_gate() -> RulesetDocument {
    RulesetDocument::new(GroupLogic::Any, vec![RuleNode::greater_than(
        "creditHistory.creditScore",
        700.0,
    )])
}

// ============================================================================
// SECTION: Accuracy Identity
// ============================================================================

#[test]
fn test_accuracy_matches_confusion_counts_exactly() {
    let dataset = vec![
        scored("r-1", 750, Some(true)),
        scored("r-2", 600, Some(false)),
        scored("r-3", 710, Some(true)),
        scored("r-4", 690, Some(true)),
        scored("r-5", 720, Some(false)),
    ];
    let result = validate(&score_gate(), &dataset).unwrap();

    let confusion = result.confusion;
    let total = confusion.total();
    assert_eq!(total, dataset.len());
    #[allow(clippy::cast_precision_loss, reason = "Test dataset sizes fit f64 exactly.")]
    let expected = confusion.correct() as f64 / total as f64;
    assert_eq!(result.accuracy, expected);
}

#[test]
fn test_half_right_dataset_yields_exact_confusion() {
    // r-1: predicted true, actual true  -> tp
    // r-2: predicted false, actual false -> tn
    // r-3: predicted true, actual false -> fp
    // r-4: predicted false, actual true  -> fn
    let dataset = vec![
        scored("r-1", 750, Some(true)),
        scored("r-2", 600, Some(false)),
        scored("r-3", 720, Some(false)),
        scored("r-4", 650, Some(true)),
    ];
    let result = validate(&score_gate(), &dataset).unwrap();

    assert_eq!(result.accuracy, 0.5);
    assert_eq!(result.confusion.true_positive, 1);
    assert_eq!(result.confusion.true_negative, 1);
    assert_eq!(result.confusion.false_positive, 1);
    assert_eq!(result.confusion.false_negative, 1);

    let wrong: Vec<&str> =
        result.misclassified.iter().map(|entry| entry.record_id.as_str()).collect();
    assert_eq!(wrong, vec!["r-3", "r-4"]);

    assert!(result.misclassified[0].predicted);
    assert!(!result.misclassified[0].actual);
    assert!(!result.misclassified[1].predicted);
    assert!(result.misclassified[1].actual);
}

// ============================================================================
// SECTION: Degenerate Datasets
// ============================================================================

#[test]
fn test_empty_dataset_is_rejected() {
    let result = validate(&score_gate(), &[]);
    assert_eq!(result.unwrap_err(), ValidateError::EmptyDataset);
}

#[test]
fn test_all_unlabeled_dataset_is_rejected() {
    let dataset = vec![scored("r-1", 750, None), scored("r-2", 600, None)];
    let result = validate(&score_gate(), &dataset);
    assert_eq!(result.unwrap_err(), ValidateError::EmptyDataset);
}

#[test]
fn test_unlabeled_records_are_skipped() {
    let dataset = vec![
        scored("r-1", 750, Some(true)),
        scored("r-2", 600, None),
        scored("r-3", 600, Some(false)),
    ];
    let result = validate(&score_gate(), &dataset).unwrap();
    assert_eq!(result.confusion.total(), 2);
    assert_eq!(result.accuracy, 1.0);
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

#[test]
fn test_repeated_validation_is_identical() {
    let dataset = vec![
        scored("r-1", 750, Some(true)),
        scored("r-2", 600, Some(true)),
        scored("r-3", 710, Some(false)),
    ];
    let first = validate(&score_gate(), &dataset).unwrap();
    let second = validate(&score_gate(), &dataset).unwrap();
    assert_eq!(first, second);
}
